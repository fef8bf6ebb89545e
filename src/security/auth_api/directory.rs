//! Current account roles, consulted when a token claims an elevated role.
//!
//! Session tokens live for hours; the stored role is the source of truth for
//! anything gated on `ADMIN_ROLES`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::core::shared::enums::UserRole;
use crate::core::shared::error::ApiError;

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Stored role of the account, `None` once the account is gone.
    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, ApiError>;
}

/// Roles kept in memory. Used by tests and by local runs without a database.
#[derive(Debug, Default)]
pub struct MemoryAccountDirectory {
    roles: Mutex<HashMap<Uuid, UserRole>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_role(&self, user_id: Uuid, role: UserRole) {
        if let Ok(mut roles) = self.roles.lock() {
            roles.insert(user_id, role);
        }
    }

    pub fn remove(&self, user_id: Uuid) {
        if let Ok(mut roles) = self.roles.lock() {
            roles.remove(&user_id);
        }
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, ApiError> {
        self.roles
            .lock()
            .map(|roles| roles.get(&user_id).copied())
            .map_err(|_| ApiError::internal("account directory poisoned"))
    }
}
