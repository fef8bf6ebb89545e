//! Helpers for router tests and the database-backed integration suite.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::core::shared::enums::UserRole;
use crate::core::shared::state::{AppState, AppStateBuilder};
use crate::security::auth_api::MemoryAccountDirectory;

pub const TEST_JWT_SECRET: &str = "zelene-test-secret-0123456789abcdefghij";

/// Configuration that passes validation without touching real services.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.smtp.username = "test".into();
    config.smtp.password = "test".into();
    config.auth.jwt_secret = TEST_JWT_SECRET.into();
    config.database.run_migrations = false;
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }
    config
}

/// State whose pool connects lazily; routes that never reach the
/// database work without one.
pub fn test_state() -> Arc<AppState> {
    state_from(AppStateBuilder::new(test_config()))
}

/// State plus the directory its elevated sessions are checked against.
pub fn test_state_with_accounts() -> (Arc<AppState>, Arc<MemoryAccountDirectory>) {
    let accounts = Arc::new(MemoryAccountDirectory::new());
    let builder = AppStateBuilder::new(test_config()).with_accounts(accounts.clone());
    (state_from(builder), accounts)
}

/// Stores the account in the directory first, as elevated tokens require.
pub fn registered_bearer(
    state: &AppState,
    accounts: &MemoryAccountDirectory,
    role: UserRole,
) -> (Uuid, String) {
    let (user_id, token) = bearer_for(state, role);
    accounts.set_role(user_id, role);
    (user_id, token)
}

pub fn state_from(builder: AppStateBuilder) -> Arc<AppState> {
    match builder.build() {
        Ok(state) => Arc::new(state),
        Err(e) => panic!("test state: {e}"),
    }
}

/// Issues a session token for a fresh user id with the given role. Elevated
/// roles also need [`registered_bearer`] to get past the role check.
pub fn bearer_for(state: &AppState, role: UserRole) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    bearer_for_user(state, user_id, "tester", role)
}

pub fn bearer_for_user(
    state: &AppState,
    user_id: Uuid,
    username: &str,
    role: UserRole,
) -> (Uuid, String) {
    match state.jwt.issue(user_id, username, role) {
        Ok(token) => (user_id, token.access_token),
        Err(e) => panic!("test token: {e}"),
    }
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    match builder.body(body) {
        Ok(request) => request,
        Err(e) => panic!("test request: {e}"),
    }
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(e) => panic!("test body: {e}"),
    };
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
