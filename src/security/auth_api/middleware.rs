use super::{
    config::AuthConfig,
    directory::AccountDirectory,
    error::AuthError,
    types::AuthenticatedUser,
    utils::extract_token,
};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::shared::enums::UserRole;
use crate::security::jwt::JwtManager;

#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub config: Arc<AuthConfig>,
    pub jwt: Arc<JwtManager>,
    pub accounts: Arc<dyn AccountDirectory>,
}

impl AuthMiddlewareState {
    pub fn new(
        config: Arc<AuthConfig>,
        jwt: Arc<JwtManager>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            config,
            jwt,
            accounts,
        }
    }
}

/// Resolves the caller and stores it as a request extension.
///
/// Requests without a usable token continue as anonymous; the routers decide
/// whether that is enough. A token claiming an elevated role is checked
/// against the stored account, so a demotion or deletion applies at once.
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let mut user = match extract_token(&request, &state.config) {
        Some(token) => resolve_user(&state.jwt, &token).unwrap_or_else(|e| {
            warn!("Ignoring session token: {}", e);
            AuthenticatedUser::anonymous()
        }),
        None => AuthenticatedUser::anonymous(),
    };

    if user.is_admin() {
        match state.accounts.current_role(user.user_id).await {
            Ok(Some(role)) => {
                if user.role != Some(role) {
                    warn!(
                        "{} holds a {:?} token but is now {}",
                        user.username, user.role, role
                    );
                    user.role = Some(role);
                }
            }
            Ok(None) => {
                warn!("Ignoring session token of deleted account {}", user.user_id);
                user = AuthenticatedUser::anonymous();
            }
            Err(e) => return e.into_response(),
        }
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn resolve_user(jwt: &JwtManager, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = jwt.validate(token).map_err(|_| AuthError::InvalidToken)?;
    debug!("Authenticated {} as {}", claims.username, claims.role);
    Ok(AuthenticatedUser::new(claims.sub, claims.username, claims.role)
        .with_session(claims.jti.to_string()))
}

fn current_user(request: &Request<Body>) -> AuthenticatedUser {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .unwrap_or_else(AuthenticatedUser::anonymous)
}

pub async fn require_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if !current_user(&request).is_authenticated() {
        return Err(AuthError::MissingToken);
    }

    Ok(next.run(request).await)
}

/// Gate for a router: the session must exist and its role must be in the
/// router's declared allow-list. Runs before any handler touches the database.
pub async fn require_roles_middleware(
    State(allowed): State<&'static [UserRole]>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let user = current_user(&request);

    if !user.is_authenticated() {
        return Err(AuthError::MissingToken);
    }

    if !user.has_any_role(allowed) {
        warn!(
            "{} ({:?}) denied {} {}",
            user.username,
            user.role,
            request.method(),
            request.uri().path()
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}
