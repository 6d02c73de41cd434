use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use coach_site::{
    AppConfig, AppState, MemoryRepository, create_router, models::Post,
    repository::{Repository, RepositoryState},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::util::ServiceExt;

const PASSWORD: &str = "local-admin-password";

// --- Test Context and Setup ---

struct TestApp {
    router: Router,
    repo: Arc<MemoryRepository>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    fn with_config(config: AppConfig) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let state = AppState::new(repo.clone() as RepositoryState, &config);
        TestApp {
            router: create_router(state),
            repo,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn send_json(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Value,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Logs in and returns the `name=value` pair to send back as a Cookie header.
    async fn login(&self) -> String {
        let response = self
            .send_json(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_pair(&response)
    }
}

fn session_pair(response: &Response) -> String {
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_post(response: Response) -> Post {
    serde_json::from_value(body_json(response).await).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.get("/api/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "ok": true, "database": true })
    );
}

#[tokio::test]
async fn test_health_check_reports_database_outage() {
    let app = TestApp::new();
    app.repo.set_unavailable(true);

    let response = app.get("/api/health").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["database"], false);
}

#[tokio::test]
async fn test_login_statuses() {
    let app = TestApp::new();

    let ok = app
        .send_json(Method::POST, "/api/auth/login", None, json!({ "password": PASSWORD }))
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let set_cookie = ok.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("admin="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=21600"));
    assert!(!set_cookie.contains("Secure"), "local runs do not require HTTPS");
    assert_eq!(body_json(ok).await, json!({ "ok": true }));

    let wrong = app
        .send_json(Method::POST, "/api/auth/login", None, json!({ "password": "nope" }))
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_login_without_configured_password_is_500() {
    let app = TestApp::with_config(AppConfig {
        admin_password: None,
        ..AppConfig::default()
    });

    for password in [PASSWORD, "", "anything"] {
        let response = app
            .send_json(Method::POST, "/api/auth/login", None, json!({ "password": password }))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Server misconfigured");
    }
}

#[tokio::test]
async fn test_logout_expires_cookie() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("admin=;") || set_cookie.starts_with("admin=\"\""));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_blog_end_to_end_scenario() {
    let app = TestApp::new();
    let cookie = app.login().await;

    // Create "Hello, World!" -> hello-world
    let first = app
        .send_json(
            Method::POST,
            "/api/posts",
            Some(&cookie),
            json!({ "title": "Hello, World!", "content": "First", "tags": "intro, welcome" }),
        )
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = body_post(first).await;
    assert_eq!(first.slug, "hello-world");
    assert_eq!(first.tags, vec!["intro", "welcome"]);

    // Create "Hello World" -> hello-world-1
    let second = app
        .send_json(
            Method::POST,
            "/api/posts",
            Some(&cookie),
            json!({ "title": "Hello World", "content": "Second" }),
        )
        .await;
    assert_eq!(second.status(), StatusCode::CREATED);
    let second = body_post(second).await;
    assert_eq!(second.slug, "hello-world-1");

    // Unpublish the first post.
    let updated = app
        .send_json(
            Method::PUT,
            &format!("/api/posts/{}", first.id),
            Some(&cookie),
            json!({ "published": false }),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_post(updated).await;
    assert!(!updated.published);
    assert_eq!(updated.slug, "hello-world");

    // The public listing excludes it...
    let listed: Vec<Post> = serde_json::from_value(body_json(app.get("/api/posts").await).await).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, second.id);

    // ...but a direct fetch by slug still returns it.
    let direct = app.get("/api/posts/hello-world").await;
    assert_eq!(direct.status(), StatusCode::OK);
    assert_eq!(body_post(direct).await.id, first.id);

    // The admin dashboard sees both.
    let admin = app
        .send(
            Request::builder()
                .uri("/admin/posts")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(admin.status(), StatusCode::OK);
    let all: Vec<Post> = serde_json::from_value(body_json(admin).await).unwrap();
    assert_eq!(all.len(), 2);

    // Delete, then every read is 404.
    let deleted = app
        .send_json(
            Method::DELETE,
            &format!("/api/posts/{}", first.id),
            Some(&cookie),
            json!({}),
        )
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(body_json(deleted).await, json!({ "ok": true }));

    assert_eq!(
        app.get(&format!("/api/posts/{}", first.id)).await.status(),
        StatusCode::NOT_FOUND
    );
    let missing = app.get("/api/posts/hello-world").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["error"], "Not found");
}

#[tokio::test]
async fn test_update_and_delete_unknown_post_are_404() {
    let app = TestApp::new();
    let cookie = app.login().await;
    let unknown = "/api/posts/6f1c1c2e-9d7b-4c4e-9a53-0c4bd9a1f001";

    let updated = app
        .send_json(Method::PUT, unknown, Some(&cookie), json!({ "title": "x" }))
        .await;
    let deleted = app
        .send_json(Method::DELETE, unknown, Some(&cookie), json!({}))
        .await;

    assert_eq!(updated.status(), StatusCode::NOT_FOUND);
    assert_eq!(deleted.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_with_invalid_date_is_400() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .send_json(
            Method::POST,
            "/api/posts",
            Some(&cookie),
            json!({ "title": "When?", "date": "someday" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_during_outage_is_generic_500() {
    let app = TestApp::new();
    let cookie = app.login().await;
    app.repo.set_unavailable(true);

    let response = app
        .send_json(Method::POST, "/api/posts", Some(&cookie), json!({ "title": "Down" }))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Internal server error");
}

#[tokio::test]
async fn test_public_listing_during_outage_is_empty_200() {
    let app = TestApp::new();
    app.repo.set_unavailable(true);

    let response = app.get("/api/posts").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_contact_intake() {
    let app = TestApp::new();

    let honeypot = app
        .send_json(Method::POST, "/api/contact", None, json!({ "website": "spam.example" }))
        .await;
    assert_eq!(honeypot.status(), StatusCode::OK);

    let missing = app
        .send_json(Method::POST, "/api/contact", None, json!({ "name": "Sam", "email": "" }))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(missing).await["error"], "Validation failed: Missing fields");

    let accepted = app
        .send_json(
            Method::POST,
            "/api/contact",
            None,
            json!({
                "name": "Sam",
                "email": "sam@example.com",
                "message": "I'd like to book a session."
            }),
        )
        .await;
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(body_json(accepted).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new();

    let response = app.get("/api-docs/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/api/posts"].is_object());
}

// --- Over the wire ---

#[tokio::test]
async fn test_admin_flow_over_http() {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let router = create_router(AppState::new(repo, &AppConfig::default()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let redirected = client
        .get(format!("{address}/admin"))
        .send()
        .await
        .expect("req fail");
    assert_eq!(redirected.status(), 307);
    assert_eq!(
        redirected.headers()["location"],
        "/admin/login?next=%2Fadmin"
    );

    let login = client
        .post(format!("{address}/api/auth/login"))
        .json(&json!({ "password": PASSWORD }))
        .send()
        .await
        .expect("login fail");
    assert_eq!(login.status(), 200);
    let cookie = login.headers()["set-cookie"]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let created = client
        .post(format!("{address}/api/posts"))
        .header("cookie", &cookie)
        .json(&json!({ "title": "Over The Wire", "published": true }))
        .send()
        .await
        .expect("create fail");
    assert_eq!(created.status(), 201);
    assert!(created.headers().contains_key("x-request-id"));
    let post: Post = created.json().await.unwrap();
    assert_eq!(post.slug, "over-the-wire");

    let fetched = client
        .get(format!("{address}/api/posts/over-the-wire"))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);
}

// --- Malformed Input & Hardening ---

#[tokio::test]
async fn test_mistyped_body_gets_json_validation_error() {
    let app = TestApp::new();
    let cookie = app.login().await;

    let response = app
        .send_json(
            Method::POST,
            "/api/posts",
            Some(&cookie),
            json!({ "title": "x", "published": "yes" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Validation failed"), "got {error:?}");
    assert!(error.contains("published"));
    assert!(app.repo.list_posts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unparseable_login_body_gets_json_error() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_login_page_only_returns_into_admin_area() {
    let app = TestApp::new();

    for next in ["%2F%2Fevil.example", "%2F%5Cevil.example", "https%3A%2F%2Fevil.example"] {
        let response = app.get(&format!("/admin/login?next={next}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains(r#"data-next="/admin""#), "next={next}");
        assert!(!page.contains("evil.example"), "next={next}");
    }

    let response = app.get("/admin/login?next=%2Fadmin%2Fposts").await;
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains(r#"data-next="/admin/posts""#));
}

#[tokio::test]
async fn test_health_outage_hides_store_details() {
    let app = TestApp::new();
    app.repo.set_unavailable(true);

    let response = app.get("/api/health").await;

    let body = body_json(response).await;
    assert_eq!(body["error"], "Database unreachable");
    assert!(!body.to_string().contains("connection refused"));
}
