use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_shared::TokenSigner;
use quill_store::Database;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::image_store::ImageStore;
use crate::mailer::Mailer;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::routes::{admin, auth, posts, users};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub tokens: Arc<TokenSigner>,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<ImageStore>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/verify-email/:token", get(auth::verify_email))
        .route("/api/auth/login", post(auth::login))
        .route(
            "/api/auth/request-password-reset",
            post(auth::request_password_reset),
        )
        .route("/api/auth/reset-password", post(auth::reset_password))
        // profile
        .route(
            "/api/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        // posts
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/api/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/api/posts/:id/restore", put(posts::restore_post))
        .route("/api/posts/:id/like", post(posts::toggle_like))
        .route("/api/posts/:id/comment", post(posts::add_comment))
        .route(
            "/api/posts/:id/comment/:comment_id",
            delete(posts::delete_own_comment),
        )
        // admin
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/approve/:id", put(admin::approve_user))
        .route("/api/admin/users/suspend/:id", put(admin::suspend_user))
        .route("/api/admin/users/unsuspend/:id", put(admin::unsuspend_user))
        .route("/api/admin/users/:id", delete(admin::delete_user))
        .route("/api/admin/posts/:id", delete(admin::delete_post))
        .route("/api/admin/posts/restore/:id", put(admin::restore_post))
        .route(
            "/api/admin/posts/:post_id/comments/:comment_id",
            delete(admin::delete_comment),
        )
        .route(
            "/api/admin/posts/:post_id/comments/:comment_id/restore",
            put(admin::restore_comment),
        )
        // stored images
        .route("/api/images/:name", get(serve_image))
        .layer(DefaultBodyLimit::max(12 * 1024 * 1024))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn serve_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let (data, content_type) = state.images.read_image(&name).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use quill_shared::token::PURPOSE_VERIFY_EMAIL;
    use quill_shared::Role;

    use crate::mailer::testing::RecordingMailer;

    use super::*;

    struct TestApp {
        router: Router,
        state: AppState,
        mailer: Arc<RecordingMailer>,
        _dir: tempfile::TempDir,
    }

    async fn test_app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let images = ImageStore::new(dir.path().join("uploads"), 1024 * 1024)
            .await
            .unwrap();
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            tokens: Arc::new(TokenSigner::new("test-secret")),
            mailer: mailer.clone(),
            images: Arc::new(images),
            rate_limiter: RateLimiter::new(10_000, StdDuration::from_secs(60)),
            config: Arc::new(ServerConfig::default()),
        };

        TestApp {
            router: build_router(state.clone()),
            state,
            mailer,
            _dir: dir,
        }
    }

    async fn request(
        app: &TestApp,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Register + verify + approve a user directly against the store and
    /// return (id, session token).
    async fn active_user(app: &TestApp, name: &str) -> (Uuid, String) {
        let id = {
            let db = app.state.db.lock().await;
            let user = db
                .insert_user(name, &format!("{name}@example.com"), "hash")
                .unwrap();
            db.set_verified(user.id).unwrap();
            db.set_approved(user.id).unwrap();
            user.id
        };
        let token = app
            .state
            .tokens
            .issue_session(id, Role::User, Duration::hours(1))
            .unwrap();
        (id, token)
    }

    async fn admin_user(app: &TestApp, name: &str) -> (Uuid, String) {
        let (id, _) = active_user(app, name).await;
        {
            let db = app.state.db.lock().await;
            db.promote_admin(&format!("{name}@example.com")).unwrap();
        }
        let token = app
            .state
            .tokens
            .issue_session(id, Role::Admin, Duration::hours(1))
            .unwrap();
        (id, token)
    }

    async fn create_post(app: &TestApp, token: &str, title: &str) -> Uuid {
        let boundary = "quill-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             {title}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"content\"\r\n\r\n\
             Some body text\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/posts")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        value["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = test_app().await;
        let (status, body) = request(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn registration_to_login_lifecycle() {
        let app = test_app().await;

        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "email": "  Alice@Example.COM ",
                "password": "hunter2024!"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["email"], "alice@example.com");
        let user_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

        let login = json!({ "email": "alice@example.com", "password": "hunter2024!" });

        // Unverified first, approval second.
        let (status, body) =
            request(&app, "POST", "/api/auth/login", None, Some(login.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_NOT_VERIFIED");

        let verify = app
            .state
            .tokens
            .issue_action(user_id, PURPOSE_VERIFY_EMAIL, Duration::hours(1))
            .unwrap();
        let (status, _) = request(
            &app,
            "GET",
            &format!("/api/auth/verify-email/{verify}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            request(&app, "POST", "/api/auth/login", None, Some(login.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_PENDING");

        let (_, admin_token) = admin_user(&app, "root").await;
        let (status, _) = request(
            &app,
            "PUT",
            &format!("/api/admin/users/approve/{user_id}"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = request(&app, "POST", "/api/auth/login", None, Some(login)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn password_reset_flow() {
        let app = test_app().await;

        // Unknown address is reported, not silently accepted.
        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/request-password-reset",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "USER_NOT_FOUND");

        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "judy",
                "email": "judy@example.com",
                "password": "original1!"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let user_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
        {
            let db = app.state.db.lock().await;
            db.set_verified(user_id).unwrap();
            db.set_approved(user_id).unwrap();
        }

        // Email normalization applies to the reset lookup too.
        let (status, _) = request(
            &app,
            "POST",
            "/api/auth/request-password-reset",
            None,
            Some(json!({ "email": " Judy@Example.COM" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // The transport saw the verification mail then the reset mail; the
        // reset token is the last word of the plain-text body.
        let token = {
            let sent = app.mailer.sent.lock().unwrap();
            let mail = sent.last().unwrap();
            assert_eq!(mail.to, "judy@example.com");
            assert_eq!(mail.subject, "Password reset");
            mail.text.rsplit(' ').next().unwrap().to_string()
        };

        // The registration strength policy applies to the replacement.
        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": token.as_str(), "newPassword": "weak" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "WEAK_PASSWORD");

        let (status, _) = request(
            &app,
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": token.as_str(), "newPassword": "changed2@" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Old credential dead, new one logs in.
        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "judy@example.com", "password": "original1!" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");

        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "judy@example.com", "password": "changed2@" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());

        // Reset tokens are time-scoped, not single-use: replaying one
        // before expiry succeeds.
        let (status, _) = request(
            &app,
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": token.as_str(), "newPassword": "changed3#" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // A verification token cannot drive a reset.
        let verify = app
            .state
            .tokens
            .issue_action(user_id, PURPOSE_VERIFY_EMAIL, Duration::hours(1))
            .unwrap();
        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": verify, "newPassword": "changed4$" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = test_app().await;
        let payload = json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "hunter2024!"
        });

        let (status, _) =
            request(&app, "POST", "/api/auth/register", None, Some(payload.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        // Same address with different case and padding still collides.
        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": "bob2",
                "email": " BOB@example.com",
                "password": "hunter2024!"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "EMAIL_EXISTS");
    }

    #[tokio::test]
    async fn bad_credentials_and_tokens() {
        let app = test_app().await;

        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "whatever1!" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");

        let (status, body) = request(&app, "GET", "/api/users/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "MISSING_TOKEN");

        let (status, body) =
            request(&app, "GET", "/api/users/profile", Some("not.a.token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn admin_routes_reject_ordinary_users() {
        let app = test_app().await;
        let (_, token) = active_user(&app, "carol").await;

        let (status, body) =
            request(&app, "GET", "/api/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ADMIN_REQUIRED");
    }

    #[tokio::test]
    async fn banned_caller_is_rejected_at_the_gate() {
        let app = test_app().await;
        let (id, token) = active_user(&app, "dave").await;
        {
            let db = app.state.db.lock().await;
            db.set_banned(id, true).unwrap();
        }

        let (status, body) = request(&app, "GET", "/api/users/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCOUNT_BANNED");
    }

    #[tokio::test]
    async fn post_and_comment_moderation_flow() {
        let app = test_app().await;
        let (_, author) = active_user(&app, "erin").await;
        let (_, commenter) = active_user(&app, "frank").await;
        let (_, admin_token) = admin_user(&app, "root").await;

        let post_id = create_post(&app, &author, "Hello world").await;

        let (status, body) = request(
            &app,
            "POST",
            &format!("/api/posts/{post_id}/comment"),
            Some(&commenter),
            Some(json!({ "text": "  first!  " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["text"], "first!");
        let comment_id = body["data"]["id"].as_str().unwrap().to_string();

        // Admin hides the comment; getPost no longer shows it.
        let (status, _) = request(
            &app,
            "DELETE",
            &format!("/api/admin/posts/{post_id}/comments/{comment_id}"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = request(&app, "GET", &format!("/api/posts/{post_id}"), None, None).await;
        assert_eq!(body["data"]["comments"].as_array().unwrap().len(), 0);

        // Restore brings it back.
        let (status, _) = request(
            &app,
            "PUT",
            &format!("/api/admin/posts/{post_id}/comments/{comment_id}/restore"),
            Some(&admin_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = request(&app, "GET", &format!("/api/posts/{post_id}"), None, None).await;
        assert_eq!(body["data"]["comments"].as_array().unwrap().len(), 1);

        // A non-author cannot hard-delete someone else's comment.
        let (status, body) = request(
            &app,
            "DELETE",
            &format!("/api/posts/{post_id}/comment/{comment_id}"),
            Some(&author),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "COMMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn non_author_post_mutations_are_hidden() {
        let app = test_app().await;
        let (_, author) = active_user(&app, "gina").await;
        let (_, other) = active_user(&app, "hank").await;

        let post_id = create_post(&app, &author, "Mine").await;

        let (status, body) = request(
            &app,
            "DELETE",
            &format!("/api/posts/{post_id}"),
            Some(&other),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "POST_NOT_FOUND");
    }

    #[tokio::test]
    async fn get_post_bumps_views_and_like_toggles() {
        let app = test_app().await;
        let (_, author) = active_user(&app, "iris").await;
        let post_id = create_post(&app, &author, "Counted").await;

        let (_, body) = request(&app, "GET", &format!("/api/posts/{post_id}"), None, None).await;
        assert_eq!(body["data"]["views"], 1);
        let (_, body) = request(&app, "GET", &format!("/api/posts/{post_id}"), None, None).await;
        assert_eq!(body["data"]["views"], 2);

        let (status, body) = request(
            &app,
            "POST",
            &format!("/api/posts/{post_id}/like"),
            Some(&author),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["liked"], true);

        let (_, body) = request(
            &app,
            "POST",
            &format!("/api/posts/{post_id}/like"),
            Some(&author),
            None,
        )
        .await;
        assert_eq!(body["data"]["liked"], false);
        assert_eq!(body["data"]["likes"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn rate_limit_answers_429() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let images = ImageStore::new(dir.path().join("uploads"), 1024)
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            tokens: Arc::new(TokenSigner::new("test-secret")),
            mailer: mailer.clone(),
            images: Arc::new(images),
            rate_limiter: RateLimiter::new(2, StdDuration::from_secs(60)),
            config: Arc::new(ServerConfig::default()),
        };
        let app = TestApp {
            router: build_router(state.clone()),
            state,
            mailer,
            _dir: dir,
        };

        // Requests without a resolvable client IP are not limited.
        let (status, _) = request(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);

        // ConnectInfo is absent under oneshot, so identify via header.
        for expected in [StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS] {
            let response = app
                .router
                .clone()
                .oneshot(
                    Request::builder()
                        .method("GET")
                        .uri("/health")
                        .header("x-forwarded-for", "203.0.113.9")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }
}
