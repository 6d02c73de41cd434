use crate::{
    AppState,
    error::{AppError, ErrorBody},
    gate::post_login_target,
    json::Json as JsonBody,
    models::{
        ContactRequest, CreatePostRequest, HealthResponse, LoginPageQuery, LoginRequest,
        OkResponse, Post, UpdatePostRequest,
    },
    posts::PostService,
    session::SessionIssuer,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

// --- Health ---

/// health
///
/// [Public Route] Liveness check including a database round-trip.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and database reachable", body = HealthResponse),
        (status = 500, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                database: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    ok: false,
                    database: false,
                    error: Some("Database unreachable".to_string()),
                }),
            )
        }
    }
}

// --- Posts ---

/// list_posts
///
/// [Public Route] Lists published posts, newest first.
///
/// *Resilience*: a store outage yields `200 []` rather than an error so the public blog
/// section keeps rendering.
#[utoipa::path(
    get,
    path = "/api/posts",
    responses((status = 200, description = "Published posts", body = [Post]))
)]
pub async fn list_posts(State(posts): State<PostService>) -> Json<Vec<Post>> {
    Json(posts.published_or_empty().await)
}

/// create_post
///
/// [Admin Route] Creates a post. The slug is derived from the title and made unique.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid date", body = ErrorBody),
        (status = 401, description = "No admin session", body = ErrorBody),
        (status = 500, description = "Failed to create post", body = ErrorBody)
    )
)]
pub async fn create_post(
    State(posts): State<PostService>,
    JsonBody(payload): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = posts.create(payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// get_post
///
/// [Public Route] Fetches one post by id or slug.
///
/// *Note*: drafts are returned too; only the listing filters on `published`.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post id or slug")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_post(
    State(posts): State<PostService>,
    Path(key): Path<String>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(posts.get_by_id_or_slug(&key).await?))
}

/// update_post
///
/// [Admin Route] Partial update; omitted fields keep their value and the slug never changes.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 401, description = "No admin session", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_post(
    State(posts): State<PostService>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(posts.update(&id, payload).await?))
}

/// delete_post
///
/// [Admin Route] Hard delete.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 401, description = "No admin session", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_post(
    State(posts): State<PostService>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    posts.delete(&id).await?;
    Ok(Json(OkResponse::ok()))
}

// --- Session ---

/// login
///
/// [Public Route] Exchanges the admin password for a session cookie valid for six hours.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = OkResponse),
        (status = 401, description = "Wrong password", body = ErrorBody),
        (status = 500, description = "No admin password configured", body = ErrorBody)
    )
)]
pub async fn login(
    State(sessions): State<SessionIssuer>,
    jar: CookieJar,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<(CookieJar, Json<OkResponse>), AppError> {
    let cookie = sessions.login(&payload.password)?;
    Ok((jar.add(cookie), Json(OkResponse::ok())))
}

/// logout
///
/// [Public Route] Expires the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cookie cleared", body = OkResponse))
)]
pub async fn logout(
    State(sessions): State<SessionIssuer>,
    jar: CookieJar,
) -> (CookieJar, Json<OkResponse>) {
    (jar.add(sessions.logout_cookie()), Json(OkResponse::ok()))
}

// --- Contact ---

/// submit_contact
///
/// [Public Route] Accepts an inquiry from the contact section.
///
/// A filled-in honeypot is acknowledged without doing anything. Mail delivery is handled
/// outside this service; the inquiry is recorded in the structured log.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Received", body = OkResponse),
        (status = 400, description = "Missing fields", body = ErrorBody)
    )
)]
pub async fn submit_contact(
    JsonBody(payload): JsonBody<ContactRequest>,
) -> Result<Json<OkResponse>, AppError> {
    if payload.website.as_deref().is_some_and(|w| !w.is_empty()) {
        tracing::debug!("contact honeypot triggered, dropping inquiry");
        return Ok(Json(OkResponse::ok()));
    }

    let filled = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());
    if !(filled(&payload.name) && filled(&payload.email) && filled(&payload.message)) {
        return Err(AppError::Validation("Missing fields".to_string()));
    }

    let inquiry_id = Uuid::new_v4();
    tracing::info!(
        %inquiry_id,
        name = payload.name.as_deref().unwrap_or_default(),
        "contact inquiry received"
    );
    // Contact details and the message body stay out of the production log level.
    tracing::debug!(
        %inquiry_id,
        email = payload.email.as_deref().unwrap_or_default(),
        company = payload.company.as_deref(),
        phone = payload.phone.as_deref(),
        message = payload.message.as_deref().unwrap_or_default(),
        "contact inquiry details"
    );
    Ok(Json(OkResponse::ok()))
}

// --- Admin Area ---

/// [Admin Route] The dashboard entry point.
pub async fn admin_index() -> Redirect {
    Redirect::to("/admin/posts")
}

/// admin_posts
///
/// [Admin Route] Every post, drafts included, newest first.
#[utoipa::path(
    get,
    path = "/admin/posts",
    responses(
        (status = 200, description = "All posts", body = [Post]),
        (status = 307, description = "No admin session, redirected to login")
    )
)]
pub async fn admin_posts(State(posts): State<PostService>) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(posts.all().await?))
}

const LOGIN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Admin login</title></head>
<body>
  <form id="login" data-next="__NEXT__">
    <label>Password <input type="password" name="password" required></label>
    <button type="submit">Sign in</button>
  </form>
  <script>
    document.getElementById("login").addEventListener("submit", async (e) => {
      e.preventDefault();
      const password = new FormData(e.target).get("password");
      const res = await fetch("/api/auth/login", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ password }),
      });
      if (res.ok) {
        location.assign(e.target.dataset.next);
      } else {
        alert("Login failed");
      }
    });
  </script>
</body>
</html>"#;

/// [Public Route] The login form. Reached through the gate's redirect with `?next=`.
///
/// The post-login destination is checked here, not in the browser; anything outside the
/// admin area falls back to `/admin`.
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Html<String> {
    let target = post_login_target(query.next.as_deref());
    Html(LOGIN_PAGE.replace("__NEXT__", target))
}
