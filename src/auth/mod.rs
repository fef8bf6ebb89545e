//! Account registration and password sign-in.

pub mod accounts;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::shared::enums::UserRole;
use crate::core::shared::error::{ApiError, ApiResult};
use crate::core::shared::schema::users;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::security::jwt::IssuedToken;
use crate::security::password::{hash_password, verify_password};
use crate::security::validation::{
    validate_email, validate_password, validate_required, validate_username, Validate,
    ValidationResult,
};

pub use accounts::{DbAccountDirectory, User, UserResponse};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check(validate_username(self.username.trim()));
        result.check(validate_email(&self.email));
        result.check(validate_password(&self.password));
        result
    }
}

/// `username` also accepts the account's email address.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check(validate_required(&self.username, "username"));
        result.check(validate_required(&self.password, "password"));
        result
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: IssuedToken,
}

fn issue_session(state: &AppState, user: User) -> ApiResult<Json<SessionResponse>> {
    let token = state
        .jwt
        .issue(user.id, &user.username, user.role)
        .map_err(ApiError::internal)?;
    Ok(Json(SessionResponse {
        user: user.into(),
        token,
    }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Json(input) = payload?;
    input.validate().into_result()?;

    let user = with_conn(&state.conn, move |conn| {
        let username = input.username.trim().to_string();
        let email = accounts::normalize_email(&input.email);
        accounts::ensure_unique(conn, &username, &email, None)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            name: non_blank(input.name),
            password_hash: hash_password(&input.password).map_err(ApiError::internal)?,
            role: UserRole::Member,
            image: None,
            created_at: now,
            updated_at: now,
        };
        Ok(diesel::insert_into(users::table)
            .values(&user)
            .get_result::<User>(conn)?)
    })
    .await?;

    info!("Registered {} ({})", user.username, user.id);
    issue_session(&state, user)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Json(input) = payload?;
    input.validate().into_result()?;

    let user = with_conn(&state.conn, move |conn| {
        let login = input.username.trim().to_string();
        let found: Option<User> = users::table
            .filter(
                users::username
                    .eq(&login)
                    .or(users::email.eq(accounts::normalize_email(&login))),
            )
            .select(User::as_select())
            .first(conn)
            .optional()?;
        let Some(user) = found else {
            return Ok(None);
        };
        let matches = verify_password(&input.password, &user.password_hash)
            .map_err(ApiError::internal)?;
        Ok(matches.then_some(user))
    })
    .await?;

    match user {
        Some(user) => {
            info!("{} signed in", user.username);
            issue_session(&state, user)
        }
        None => {
            warn!("Failed sign-in attempt");
            Err(ApiError::Unauthorized)
        }
    }
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::test_utils::{json_request, read_json, test_state};
    use crate::main_module::build_router;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn test_register_rules() {
        let input = RegisterRequest {
            username: "9lives".into(),
            email: "cat@zelene.dev".into(),
            password: "12345678".into(),
            name: None,
        };
        let result = input.validate();
        assert_eq!(result.errors().len(), 1);
        assert!(result.to_error_messages()[0].contains("username"));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let response = build_router(test_state())
            .oneshot(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "username": "ana", "email": "ana@zelene.dev", "password": "short" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["fields"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let response = build_router(test_state())
            .oneshot(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "", "password": "" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
