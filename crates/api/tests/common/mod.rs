#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use locker_core::config::EngineConfig;
use locker_core::roles::{ROLE_ADMIN, ROLE_USER};
use locker_core::store::memory::MemoryLeaseStore;
use locker_core::types::DbId;
use tower::ServiceExt;

use jsonwebtoken::{encode, EncodingKey, Header};
use locker_api::auth::token::{Claims, TokenVerifier};
use locker_api::config::{ServerConfig, StoreBackend};
use locker_api::router::build_app_router;
use locker_api::state::AppState;

const TEST_SECRET: &str = "locker-integration-test-secret";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        tokens: TokenVerifier::new(TEST_SECRET),
        engine: EngineConfig::default(),
    }
}

/// Build the full application router over the given in-memory store.
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// (CORS, request ID, timeout, tracing, panic recovery) as production.
pub fn build_test_app(store: Arc<MemoryLeaseStore>) -> Router {
    build_test_app_with(store, test_config())
}

pub fn build_test_app_with(store: Arc<MemoryLeaseStore>, config: ServerConfig) -> Router {
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Sign a token the way the external issuer does, valid for 15 minutes.
pub fn mint_token(user_id: DbId, role: &str) -> String {
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: chrono::Utc::now().timestamp() + 15 * 60,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn user_token(user_id: DbId) -> String {
    mint_token(user_id, ROLE_USER)
}

pub fn admin_token(user_id: DbId) -> String {
    mint_token(user_id, ROLE_ADMIN)
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Error codes listed in a failure envelope.
pub fn error_codes(json: &serde_json::Value) -> Vec<String> {
    json["error_code"]
        .as_array()
        .map(|codes| {
            codes
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
