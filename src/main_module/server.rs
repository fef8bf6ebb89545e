//! HTTP server initialization and routing

use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::shared::state::AppState;
use crate::security::auth_api::auth_middleware;
use crate::security::create_cors_layer;

use super::{health_check, health_check_simple, shutdown_signal};

/// Every procedure router behind the session resolver, CORS and tracing.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/health", get(health_check_simple))
        .route("/api/health", get(health_check))
        .merge(crate::queries::configure_queries_routes())
        .merge(crate::queries::configure_admin_queries_routes())
        .merge(crate::social::configure_posts_routes())
        .merge(crate::social::configure_tags_routes())
        .merge(crate::profile::configure_profile_routes())
        .merge(crate::auth::configure_auth_routes())
        .merge(crate::admin::configure_admin_users_routes())
        .merge(crate::analytics::configure_stats_routes())
        .merge(crate::analytics::configure_admin_stats_routes());

    api_router
        .layer(from_fn_with_state(
            app_state.auth_middleware_state(),
            auth_middleware,
        ))
        .layer(create_cors_layer(&app_state.config.server))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_axum_server(app_state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = build_router(app_state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
