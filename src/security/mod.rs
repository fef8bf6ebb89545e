pub mod auth_api;
pub mod captcha;
pub mod cors;
pub mod jwt;
pub mod password;
pub mod validation;

pub use auth_api::{AuthConfig, AuthError, AuthenticatedUser, ADMIN_ROLES, ROOT_ROLES};
pub use captcha::CaptchaVerifier;
pub use cors::create_cors_layer;
pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password};
pub use validation::{Validate, ValidationError, ValidationResult};
