//! Integration test — build the router over in-memory stores and drive the
//! login, session and OAuth endpoints through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use emporium_api::{AppState, config::ApiConfig};
use emporium_core::auth::oauth::{OAuthProvider, OAuthStateStore};
use emporium_core::auth::password::hash_password;
use emporium_core::auth::session::MemorySessionStore;
use emporium_core::auth::users::{MemoryUserRepository, UserRepository};
use emporium_core::auth::{AuthError, AuthManager, TokenCodec};
use emporium_core::models::auth::{NewUser, OAuthProfile};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Provider that accepts the code `"good-code"` only.
struct StubProvider {
    email: &'static str,
}

#[async_trait]
impl OAuthProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn build_auth_url(&self, redirect_uri: &str, state: &str) -> String {
        format!("https://idp.example/authorize?redirect_uri={redirect_uri}&state={state}")
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<OAuthProfile, AuthError> {
        if code != "good-code" {
            return Err(AuthError::Provider("invalid_grant".into()));
        }
        Ok(OAuthProfile {
            id: "stub-42".into(),
            email: Some(self.email.into()),
            name: "Stub User".into(),
            avatar_url: None,
        })
    }
}

async fn app() -> Router {
    let users = Arc::new(MemoryUserRepository::new());
    users
        .create(NewUser {
            email: Some("ann@example.com".into()),
            name: "Ann".into(),
            password_hash: Some(hash_password("hunter22").expect("hash")),
            ..Default::default()
        })
        .await
        .expect("seed user");

    let mut auth = AuthManager::new(
        TokenCodec::new(b"api-test-secret"),
        users,
        Arc::new(MemorySessionStore::new()),
    );
    auth.register_oauth_provider(
        "stub",
        Arc::new(StubProvider {
            email: "stub@example.com",
        }),
    );
    auth.register_oauth_provider(
        "clash",
        Arc::new(StubProvider {
            email: "ann@example.com",
        }),
    );

    let state = AppState {
        auth: Arc::new(auth),
        oauth_state: Arc::new(OAuthStateStore::new()),
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: "postgres://localhost/unused".into(),
            jwt_secret: "api-test-secret".into(),
            session_ttl_secs: 900,
            google: None,
            github: None,
        },
    };
    emporium_api::router(state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("parse JSON")
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn login_me_logout_flow() {
    let app = app().await;

    let (status, json) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "ann@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["tokenType"], "Bearer");
    assert_eq!(json["expiresIn"], 900);
    assert_eq!(json["user"]["email"], "ann@example.com");
    assert!(json["user"].get("passwordHash").is_none());
    assert!(json["refreshToken"].is_string());
    let token = json["accessToken"].as_str().expect("access token").to_string();

    let (status, me) = send(&app, with_bearer("GET", "/auth/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ann");

    let (status, out) = send(&app, with_bearer("POST", "/auth/logout", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], true);

    let (status, err) = send(&app, with_bearer("GET", "/auth/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "unauthorized");
}

#[tokio::test]
async fn refresh_token_is_not_a_session() {
    let app = app().await;
    let (_, json) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "ann@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    let refresh = json["refreshToken"].as_str().unwrap();

    let (status, _) = send(&app, with_bearer("GET", "/auth/me", refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = app().await;

    let (s1, wrong) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "ann@example.com", "password": "nope"}),
        ),
    )
    .await;
    let (s2, unknown) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "bob@example.com", "password": "nope"}),
        ),
    )
    .await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn missing_or_malformed_authorization_is_rejected() {
    let app = app().await;

    let req = Request::builder()
        .uri("/auth/me")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Basic YW5uOmh1bnRlcjIy")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, with_bearer("GET", "/auth/me", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn providers_are_listed() {
    let app = app().await;
    let req = Request::builder()
        .uri("/auth/oauth/providers")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["providers"], json!(["clash", "stub"]));
}

#[tokio::test]
async fn oauth_authorize_then_callback_opens_session() {
    let app = app().await;

    let req = Request::builder()
        .uri("/auth/oauth/stub/authorize?redirectUri=http://localhost/cb")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let state = json["state"].as_str().expect("state").to_string();
    let url = json["url"].as_str().expect("url");
    assert!(url.contains(&format!("state={state}")));

    let (status, tokens) = send(
        &app,
        post_json(
            "/auth/oauth/stub/callback",
            json!({"code": "good-code", "state": state}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tokens["user"]["name"], "Stub User");

    let token = tokens["accessToken"].as_str().unwrap();
    let (status, _) = send(&app, with_bearer("GET", "/auth/me", token)).await;
    assert_eq!(status, StatusCode::OK);

    // State is single use.
    let (status, _) = send(
        &app,
        post_json(
            "/auth/oauth/stub/callback",
            json!({"code": "good-code", "state": state}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oauth_callback_with_unknown_state_is_unauthorized() {
    let app = app().await;
    let (status, json) = send(
        &app,
        post_json(
            "/auth/oauth/stub/callback",
            json!({"code": "good-code", "state": "forged"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn oauth_authorize_unknown_provider_is_unauthorized() {
    let app = app().await;
    let req = Request::builder()
        .uri("/auth/oauth/myspace/authorize?redirectUri=http://localhost/cb")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oauth_provider_failure_is_bad_gateway() {
    let app = app().await;
    let req = Request::builder()
        .uri("/auth/oauth/stub/authorize?redirectUri=http://localhost/cb")
        .body(Body::empty())
        .unwrap();
    let (_, json) = send(&app, req).await;
    let state = json["state"].as_str().unwrap();

    let (status, err) = send(
        &app,
        post_json(
            "/auth/oauth/stub/callback",
            json!({"code": "bad-code", "state": state}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(err["error"], "provider_error");
}

#[tokio::test]
async fn oauth_email_owned_by_password_account_is_unauthorized() {
    let app = app().await;
    let req = Request::builder()
        .uri("/auth/oauth/clash/authorize?redirectUri=http://localhost/cb")
        .body(Body::empty())
        .unwrap();
    let (_, json) = send(&app, req).await;
    let state = json["state"].as_str().unwrap();

    let (status, err) = send(
        &app,
        post_json(
            "/auth/oauth/clash/callback",
            json!({"code": "good-code", "state": state}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "unauthorized");

    // The password account still works.
    let (status, _) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "ann@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
