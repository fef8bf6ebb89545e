use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::UserRole;
use crate::core::shared::error::ApiError;

/// Roles allowed through the admin back-office routers.
pub const ADMIN_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::TenantAdmin];

/// Roles allowed to grant other accounts the `ADMIN` role.
pub const ROOT_ROLES: &[UserRole] = &[UserRole::Admin];

/// Caller identity attached to every request by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    /// `None` for anonymous callers.
    pub role: Option<UserRole>,
    pub session_id: Option<String>,
}

impl Default for AuthenticatedUser {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl AuthenticatedUser {
    pub fn new(user_id: Uuid, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            username: username.into(),
            role: Some(role),
            session_id: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: Uuid::nil(),
            username: "anonymous".to_string(),
            role: None,
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_some() && self.user_id != Uuid::nil()
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.role.map(|r| roles.contains(&r)).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.has_any_role(ADMIN_ROLES)
    }

    /// Owners may always modify their own records; elevated roles may modify any.
    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.is_authenticated() && (self.user_id == owner_id || self.is_admin())
    }

    pub fn ensure_authenticated(&self) -> Result<(), ApiError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}
