//! Router-level tests against the in-memory repository

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use platform::clock::ManualClock;
use platform::password::ClearTextPassword;
use platform::rate_limit::{FixedWindowRateLimiter, RateLimitConfig};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::application::{AuthConfig, SessionStore};
use crate::domain::entity::user::{NewUser, User};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, user_role::UserRole};
use crate::infra::InMemoryUserRepository;
use crate::presentation::{AuthAppState, admin_users_router, auth_router};

const PASSWORD: &str = "Velo-Rouge-1987";

struct Harness {
    app: Router,
    repo: InMemoryUserRepository,
}

fn harness_with(config: AuthConfig) -> Harness {
    let repo = InMemoryUserRepository::new();
    let sessions = Arc::new(SessionStore::new(&config));
    let limiter = Arc::new(FixedWindowRateLimiter::with_clock(Arc::new(ManualClock::new(0))));
    let state = AuthAppState::new(repo.clone(), Arc::new(config), sessions, limiter);

    let app = Router::new()
        .nest("/api/auth", auth_router(state.clone()))
        .nest("/api/admin", admin_users_router(state));

    Harness { app, repo }
}

fn harness() -> Harness {
    harness_with(AuthConfig::development())
}

impl Harness {
    async fn seed(&self, email: &str, role: UserRole) -> User {
        let password_hash = ClearTextPassword::new(PASSWORD.to_string())
            .unwrap()
            .hash(None)
            .unwrap();
        self.repo
            .create(&NewUser {
                email: Email::new(email).unwrap(),
                name: None,
                password_hash,
                role,
            })
            .await
            .unwrap()
    }

    async fn send(&self, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.9");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self, email: &str) -> String {
        let response = self
            .send("POST", "/api/auth/login", None, Some(json!({ "email": email, "password": PASSWORD })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response)
    }
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_register_signs_in() {
    let h = harness();
    let response = h
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "New@Example.com", "password": PASSWORD, "name": "Nour" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = session_cookie(&response);

    let body = json_body(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["role"], "USER");

    let status = json_body(h.send("GET", "/api/auth/session", Some(&cookie), None).await).await;
    assert_eq!(status["authenticated"], true);
    assert_eq!(status["user"]["name"], "Nour");
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let h = harness();
    h.seed("taken@example.com", UserRole::User).await;

    let duplicate = h
        .send("POST", "/api/auth/register", None, Some(json!({ "email": "TAKEN@example.com", "password": PASSWORD })))
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let bad_email = h
        .send("POST", "/api/auth/register", None, Some(json!({ "email": "nope", "password": PASSWORD })))
        .await;
    assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);

    let weak = h
        .send("POST", "/api/auth/register", None, Some(json!({ "email": "a@example.com", "password": "password123" })))
        .await;
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    h.seed("seller@example.com", UserRole::User).await;

    let wrong_password = h
        .send("POST", "/api/auth/login", None, Some(json!({ "email": "seller@example.com", "password": "Wrong-Pass-99" })))
        .await;
    let unknown = h
        .send("POST", "/api/auth/login", None, Some(json!({ "email": "ghost@example.com", "password": PASSWORD })))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(wrong_password).await["detail"], json_body(unknown).await["detail"]);
}

#[tokio::test]
async fn test_login_is_rate_limited_per_ip() {
    let h = harness_with(AuthConfig {
        login_rate_limit: RateLimitConfig::new(2, 60),
        ..AuthConfig::development()
    });
    let attempt = json!({ "email": "x@example.com", "password": "Wrong-Pass-99" });

    for _ in 0..2 {
        let r = h.send("POST", "/api/auth/login", None, Some(attempt.clone())).await;
        assert_eq!(r.status(), StatusCode::UNAUTHORIZED);
    }
    let limited = h.send("POST", "/api/auth/login", None, Some(attempt)).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.headers().get(header::RETRY_AFTER).unwrap(), "60");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let h = harness();
    let response = h.send("POST", "/api/auth/logout", None, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_garbage_cookie_is_anonymous() {
    let h = harness();
    let response = h
        .send("GET", "/api/auth/session", Some("market_session=not-a-real-token"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "authenticated": false, "user": null }));
}

#[tokio::test]
async fn test_admin_routes_are_role_gated() {
    let h = harness();
    let user = h.seed("user@example.com", UserRole::User).await;
    h.seed("admin@example.com", UserRole::Admin).await;

    let anonymous = h.send("GET", "/api/admin/users", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let user_cookie = h.login("user@example.com").await;
    let forbidden = h.send("GET", "/api/admin/users", Some(&user_cookie), None).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    // no mutation on denial
    let promote = h
        .send("PATCH", &format!("/api/admin/users/{}/role", user.id), Some(&user_cookie), Some(json!({ "role": "ADMIN" })))
        .await;
    assert_eq!(promote.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.repo.find_by_id(user.id).await.unwrap().unwrap().role, UserRole::User);

    let admin_cookie = h.login("admin@example.com").await;
    let listed = json_body(h.send("GET", "/api/admin/users", Some(&admin_cookie), None).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_ban_flow() {
    let h = harness();
    let user = h.seed("user@example.com", UserRole::User).await;
    let admin = h.seed("admin@example.com", UserRole::Admin).await;
    let admin_cookie = h.login("admin@example.com").await;

    let self_ban = h
        .send("POST", &format!("/api/admin/users/{}/ban", admin.id), Some(&admin_cookie), None)
        .await;
    assert_eq!(self_ban.status(), StatusCode::BAD_REQUEST);

    let missing = h.send("POST", "/api/admin/users/999/ban", Some(&admin_cookie), None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let invalid_id = h.send("POST", "/api/admin/users/0/ban", Some(&admin_cookie), None).await;
    assert_eq!(invalid_id.status(), StatusCode::BAD_REQUEST);

    let banned = h
        .send("POST", &format!("/api/admin/users/{}/ban", user.id), Some(&admin_cookie), None)
        .await;
    assert_eq!(banned.status(), StatusCode::OK);
    assert_eq!(json_body(banned).await["banned"], true);

    let login = h
        .send("POST", "/api/auth/login", None, Some(json!({ "email": "user@example.com", "password": PASSWORD })))
        .await;
    assert_eq!(login.status(), StatusCode::FORBIDDEN);

    let unbanned = h
        .send("POST", &format!("/api/admin/users/{}/unban", user.id), Some(&admin_cookie), None)
        .await;
    assert_eq!(unbanned.status(), StatusCode::OK);
    h.login("user@example.com").await;
}

#[tokio::test]
async fn test_change_role_rejects_unknown_role() {
    let h = harness();
    let user = h.seed("user@example.com", UserRole::User).await;
    h.seed("admin@example.com", UserRole::Admin).await;
    let admin_cookie = h.login("admin@example.com").await;

    let bad = h
        .send("PATCH", &format!("/api/admin/users/{}/role", user.id), Some(&admin_cookie), Some(json!({ "role": "ROOT" })))
        .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let ok = h
        .send("PATCH", &format!("/api/admin/users/{}/role", user.id), Some(&admin_cookie), Some(json!({ "role": "ADMIN" })))
        .await;
    assert_eq!(json_body(ok).await["role"], "ADMIN");
}

#[tokio::test]
async fn test_malformed_admin_path_and_query_check_role_first() {
    let h = harness();
    h.seed("user@example.com", UserRole::User).await;
    h.seed("admin@example.com", UserRole::Admin).await;
    let user_cookie = h.login("user@example.com").await;
    let admin_cookie = h.login("admin@example.com").await;

    let uri = "/api/admin/users/abc/ban";
    assert_eq!(h.send("POST", uri, None, None).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.send("POST", uri, Some(&user_cookie), None).await.status(), StatusCode::FORBIDDEN);
    let bad_id = h.send("POST", uri, Some(&admin_cookie), None).await;
    assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(bad_id).await["status"], 400);

    let uri = "/api/admin/users?page=first";
    assert_eq!(h.send("GET", uri, Some(&user_cookie), None).await.status(), StatusCode::FORBIDDEN);
    let bad_query = h.send("GET", uri, Some(&admin_cookie), None).await;
    assert_eq!(bad_query.status(), StatusCode::BAD_REQUEST);
}
