use axum::{
    extract::FromRef,
    http::HeaderName,
    Router,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod json;
pub mod models;
pub mod posts;
pub mod repository;
pub mod session;
pub mod slug;

// Routes grouped by access level (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, RepoError};
pub use posts::PostService;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::SessionIssuer;

/// ApiDoc
///
/// Auto-generated OpenAPI document for the JSON API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::list_posts, handlers::create_post, handlers::get_post,
        handlers::update_post, handlers::delete_post, handlers::login, handlers::logout,
        handlers::submit_contact, handlers::admin_posts
    ),
    components(
        schemas(
            models::Post, models::CreatePostRequest, models::UpdatePostRequest,
            models::TagsInput, models::LoginRequest, models::ContactRequest,
            models::OkResponse, models::HealthResponse, error::ErrorBody,
        )
    ),
    tags(
        (name = "coach-site", description = "Coaching site blog and contact API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: one cheaply cloneable container with every
/// service a handler may need, shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Raw store access (health checks).
    pub repo: RepositoryState,
    /// Post operations layered over the store.
    pub posts: PostService,
    /// Password check and session cookies.
    pub sessions: SessionIssuer,
}

impl AppState {
    /// Wires the services from a store and the loaded configuration.
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        Self {
            posts: PostService::new(repo.clone()),
            sessions: SessionIssuer::from_config(config),
            repo,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for PostService {
    fn from_ref(app_state: &AppState) -> PostService {
        app_state.posts.clone()
    }
}

impl FromRef<AppState> for SessionIssuer {
    fn from_ref(app_state: &AppState) -> SessionIssuer {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, puts the access gate in front of every route and
/// applies the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        // The gate sees every request and decides by path and method.
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            gate::access_gate,
        ))
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span so every log line of a request carries its method,
/// URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
