use axum::{
    Json,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use url::form_urlencoded;

use crate::{
    error::ErrorBody,
    session::{SESSION_COOKIE, SessionIssuer},
};

pub const ADMIN_PREFIX: &str = "/admin";
pub const LOGIN_PATH: &str = "/admin/login";
pub const POSTS_API_PREFIX: &str = "/api/posts";

/// Protection
///
/// What an incoming request needs before it may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Public: passes unconditionally.
    Open,
    /// Admin pages: unauthenticated visitors are redirected to the login page.
    AdminArea,
    /// Writes to the posts API: unauthenticated callers get a 401.
    PostsWrite,
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// classify
///
/// Decides the protection class from method and path alone. The login page sits inside
/// the admin area but stays open, or the redirect would point at itself.
pub fn classify(method: &Method, path: &str) -> Protection {
    if under(path, ADMIN_PREFIX) && path != LOGIN_PATH {
        Protection::AdminArea
    } else if under(path, POSTS_API_PREFIX) && *method != Method::GET && *method != Method::HEAD {
        Protection::PostsWrite
    } else {
        Protection::Open
    }
}

/// `/admin/login?next=<path>`, with the original path form-encoded.
pub fn login_redirect_target(original_path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", original_path)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// post_login_target
///
/// Where the login page sends the browser after a successful login. Only paths inside the
/// admin area made of plain URL path characters are kept, so `//host` or `/\host` style
/// values can never leave the site, and the result is safe to embed in an HTML attribute.
pub fn post_login_target(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if under(path, ADMIN_PREFIX)
                && path != LOGIN_PATH
                && path
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b"/-_.~%".contains(&b)) =>
        {
            path
        }
        _ => ADMIN_PREFIX,
    }
}

/// access_gate
///
/// Middleware evaluated once per request, holding no state between requests. Open
/// requests pass straight through; protected ones need a valid session cookie.
pub async fn access_gate(
    State(sessions): State<SessionIssuer>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let protection = classify(request.method(), &path);

    if protection == Protection::Open {
        return next.run(request).await;
    }

    let authorized = jar
        .get(SESSION_COOKIE)
        .is_some_and(|cookie| sessions.verify(cookie.value()));

    if authorized {
        return next.run(request).await;
    }

    tracing::debug!(%path, ?protection, "unauthenticated request blocked");
    match protection {
        Protection::AdminArea => Redirect::temporary(&login_redirect_target(&path)).into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("Unauthorized")),
        )
            .into_response(),
    }
}
