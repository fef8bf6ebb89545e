//! Session resolution and role gating for the procedure routers.

pub mod config;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod types;
pub mod utils;

pub use config::AuthConfig;
pub use directory::{AccountDirectory, MemoryAccountDirectory};
pub use error::AuthError;
pub use middleware::{
    auth_middleware, require_auth_middleware, require_roles_middleware, AuthMiddlewareState,
};
pub use types::{AuthenticatedUser, ADMIN_ROLES, ROOT_ROLES};
pub use utils::{extract_session_from_cookies, extract_token};
