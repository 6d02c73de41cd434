use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// The admin area under `/admin`. Apart from the login page, which must stay reachable,
/// the gate sends visitors without a session to `/admin/login?next=<path>`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Entry point, forwards to the post dashboard.
        .route("/admin", get(handlers::admin_index))
        // GET /admin/posts
        // All posts including drafts, for editing.
        .route("/admin/posts", get(handlers::admin_posts))
        // GET /admin/login
        // Password form. Exempt from the gate.
        .route("/admin/login", get(handlers::login_page))
}
