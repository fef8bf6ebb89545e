//! Back-office account management.

pub mod users;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::security::auth_api::{require_roles_middleware, ADMIN_ROLES};

pub fn configure_admin_users_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/admin/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/admin/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            ADMIN_ROLES,
            require_roles_middleware,
        ))
}

#[cfg(test)]
mod tests {
    use crate::core::shared::enums::UserRole;
    use crate::core::shared::test_utils::{
        bearer_for, json_request, registered_bearer, test_state, test_state_with_accounts,
    };
    use crate::main_module::build_router;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_member_cannot_manage_users() {
        let state = test_state();
        let (_, token) = bearer_for(&state, UserRole::Member);
        let response = build_router(state)
            .oneshot(json_request(Method::GET, "/api/admin/users", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let (state, accounts) = test_state_with_accounts();
        let (id, token) = registered_bearer(&state, &accounts, UserRole::Admin);
        let response = build_router(state)
            .oneshot(json_request(
                Method::DELETE,
                &format!("/api/admin/users/{id}"),
                Some(&token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_tenant_admin_cannot_create_admin() {
        let (state, accounts) = test_state_with_accounts();
        let (_, token) = registered_bearer(&state, &accounts, UserRole::TenantAdmin);
        let response = build_router(state)
            .oneshot(json_request(
                Method::POST,
                "/api/admin/users",
                Some(&token),
                Some(json!({
                    "username": "newadmin",
                    "email": "root@zelene.dev",
                    "password": "long enough",
                    "role": "ADMIN"
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
