use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::core::shared::error::ApiError;

/// Rejections raised by the session gates before a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no session token")]
    MissingToken,
    #[error("session token rejected")]
    InvalidToken,
    #[error("role not allowed on this router")]
    InsufficientPermissions,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken => ApiError::Unauthorized,
            AuthError::InsufficientPermissions => {
                ApiError::forbidden("Your role cannot access this resource")
            }
        }
    }
}

/// Same body shape as every handler error.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_gate_rejections_map_to_api_taxonomy() {
        assert_eq!(
            ApiError::from(AuthError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InsufficientPermissions.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
