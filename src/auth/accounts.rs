//! Account rows and the request shapes shared by registration and the admin
//! user endpoints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::UserRole;
use crate::core::shared::error::ApiError;
use crate::core::shared::schema::users;
use crate::core::shared::utils::{with_conn, DbPool};
use crate::security::auth_api::AccountDirectory;
use crate::security::validation::{
    validate_email, validate_optional_length, validate_password, validate_username, Validate,
    ValidationResult,
};

pub const NAME_MAX: usize = 100;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = users)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: user.name,
            role: user.role,
            image: user.image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check(validate_username(self.username.trim()));
        result.check(validate_email(&self.email));
        result.check(validate_password(&self.password));
        result.check(validate_optional_length(self.name.as_deref(), "name", NAME_MAX));
        result
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub image: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(username) = &self.username {
            result.check(validate_username(username.trim()));
        }
        if let Some(email) = &self.email {
            result.check(validate_email(email));
        }
        if let Some(password) = &self.password {
            result.check(validate_password(password));
        }
        result.check(validate_optional_length(self.name.as_deref(), "name", NAME_MAX));
        result
    }
}

/// Fails with `CONFLICT` when the username or email is taken by another account.
pub fn ensure_unique(
    conn: &mut PgConnection,
    username: &str,
    email: &str,
    except: Option<Uuid>,
) -> Result<(), ApiError> {
    let mut query = users::table
        .filter(users::username.eq(username).or(users::email.eq(email)))
        .select(users::id)
        .into_boxed();
    if let Some(id) = except {
        query = query.filter(users::id.ne(id));
    }
    let taken: Option<Uuid> = query.first(conn).optional()?;
    match taken {
        Some(_) => Err(ApiError::Conflict(
            "Username or email is already in use".to_string(),
        )),
        None => Ok(()),
    }
}

/// Reads roles straight from `users`.
pub struct DbAccountDirectory {
    pool: DbPool,
}

impl DbAccountDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for DbAccountDirectory {
    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, ApiError> {
        with_conn(&self.pool, move |conn| {
            Ok(users::table
                .find(user_id)
                .select(users::role)
                .first::<UserRole>(conn)
                .optional()?)
        })
        .await
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_rules() {
        let ok = CreateUserRequest {
            username: "ana_b".into(),
            email: "ana@zelene.dev".into(),
            password: "correct horse".into(),
            name: None,
            role: None,
        };
        assert!(ok.validate().is_valid());

        let bad = CreateUserRequest {
            username: "1ana".into(),
            email: "ana".into(),
            password: "short".into(),
            name: Some("x".repeat(101)),
            role: None,
        };
        assert_eq!(bad.validate().errors().len(), 4);
    }

    #[test]
    fn test_response_omits_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "ana".into(),
            email: "ana@zelene.dev".into(),
            name: None,
            password_hash: "$argon2id$secret".into(),
            role: UserRole::Member,
            image: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"MEMBER\""));
    }
}
