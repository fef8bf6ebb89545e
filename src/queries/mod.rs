//! Public query submission, lookup and the admin back-office over them.

pub mod admin;
pub mod handlers;
pub mod lifecycle;
pub mod models;
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;
use crate::drive::MAX_ISSUE_BODY_BYTES;
use crate::security::auth_api::{require_roles_middleware, ADMIN_ROLES};

pub use handlers::{find_query, SubmissionResponse};
pub use lifecycle::{plan_update, QueryUpdate, TransitionError};
pub use models::{ContactQuery, Feedback, QueryRecord, SupportRequest, TechnicalIssue};

pub fn configure_queries_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/queries/contact", post(handlers::submit_contact))
        .route("/api/queries/feedback", post(handlers::submit_feedback))
        .route("/api/queries/support", post(handlers::submit_support))
        .route(
            "/api/queries/technical-issue",
            post(handlers::submit_technical_issue)
                .layer(DefaultBodyLimit::max(MAX_ISSUE_BODY_BYTES)),
        )
        .route("/api/queries/lookup/:id", get(handlers::get_query_by_id))
}

pub fn configure_admin_queries_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/queries/contact", get(admin::get_contact_queries))
        .route("/api/admin/queries/feedback", get(admin::get_feedback))
        .route("/api/admin/queries/support", get(admin::get_support_requests))
        .route(
            "/api/admin/queries/technical-issues",
            get(admin::get_technical_issues),
        )
        .route("/api/admin/queries/counts", get(admin::get_query_counts))
        .route(
            "/api/admin/queries/:kind/:id",
            get(admin::get_admin_query).patch(admin::update_admin_query),
        )
        .route_layer(middleware::from_fn_with_state(
            ADMIN_ROLES,
            require_roles_middleware,
        ))
}
