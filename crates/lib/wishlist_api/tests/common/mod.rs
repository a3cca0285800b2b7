//! Shared harness: the real router over an in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wishlist_api::config::ApiConfig;
use wishlist_api::{AppState, router};
use wishlist_core::auth::jwt::JwtSettings;
use wishlist_core::store::MemoryStore;

pub const PASSWORD: &str = "pw123456";

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        jwt: JwtSettings {
            key: "IntegrationTestSigningKeyThatIsLongEnough!".into(),
            issuer: "WishlistTestApi".into(),
            audience: "WishlistTestClient".into(),
            expiration_minutes: 60,
        },
        cors_allowed_origins: Vec::new(),
        bcrypt_cost: 4,
    }
}

pub fn test_state() -> AppState {
    AppState::new(Arc::new(MemoryStore::new()), test_config()).expect("state")
}

pub fn app() -> (Router, AppState) {
    let state = test_state();
    (router(state.clone()), state)
}

/// Send one request; returns the status and the parsed body (`Null` if empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("request");

    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Register `name` and return `(token, user_id)`.
pub async fn register(app: &Router, name: &str) -> (String, i64) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"name": name, "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register {name}: {body}");
    (
        body["token"].as_str().expect("token").to_string(),
        body["userId"].as_i64().expect("userId"),
    )
}

pub async fn login(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"name": name, "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login {name}: {body}");
    body["token"].as_str().expect("token").to_string()
}

/// Create a gift titled `title` and return its id.
pub async fn create_gift(app: &Router, token: &str, title: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/gift",
        Some(token),
        Some(json!({"title": title, "category": "home"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create gift: {body}");
    body["id"].as_i64().expect("gift id")
}

/// Claim `gift_id`, returning the status and body.
pub async fn claim(app: &Router, token: &str, gift_id: i64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/volunteers",
        Some(token),
        Some(json!({"giftId": gift_id})),
    )
    .await
}
