use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are **unauthenticated** and accessible to any client.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Liveness plus a `SELECT 1` against the store, for monitoring and load balancers.
        .route("/api/health", get(handlers::health))
        // GET /api/posts
        // Published posts, newest first. Degrades to an empty list during store outages.
        .route("/api/posts", get(handlers::list_posts))
        // GET /api/posts/{id}
        // A single post by id or slug.
        .route("/api/posts/{id}", get(handlers::get_post))
        // POST /api/auth/login, /api/auth/logout
        // Issue or clear the admin session cookie.
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        // POST /api/contact
        // Contact form intake.
        .route("/api/contact", post(handlers::submit_contact))
}
