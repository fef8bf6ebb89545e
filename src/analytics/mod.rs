//! Activity statistics for members and the admin dashboard.

pub mod overview;
pub mod weekly;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::security::auth_api::{require_auth_middleware, require_roles_middleware, ADMIN_ROLES};

pub use overview::{AdminOverview, UserStats};
pub use weekly::WeeklyStats;

pub fn configure_stats_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stats/weekly", get(weekly::get_weekly_stats))
        .route_layer(middleware::from_fn(require_auth_middleware))
}

pub fn configure_admin_stats_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/stats", get(overview::get_admin_overview))
        .route("/api/admin/user-stats", get(overview::get_user_stats))
        .route_layer(middleware::from_fn_with_state(
            ADMIN_ROLES,
            require_roles_middleware,
        ))
}

#[cfg(test)]
mod tests {
    use crate::core::shared::enums::UserRole;
    use crate::core::shared::test_utils::{bearer_for, json_request, test_state};
    use crate::main_module::build_router;
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_weekly_stats_require_session() {
        let response = build_router(test_state())
            .oneshot(json_request(Method::GET, "/api/stats/weekly", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_stats_are_admin_only() {
        let state = test_state();
        let (_, token) = bearer_for(&state, UserRole::Member);
        for uri in ["/api/admin/stats", "/api/admin/user-stats"] {
            let response = build_router(state.clone())
                .oneshot(json_request(Method::GET, uri, Some(&token), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
    }
}
