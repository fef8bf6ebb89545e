use anyhow::Context;
use tracing::{error, info};

use zelene::config::AppConfig;
use zelene::main_module::{build_app_state, init_logging, run_axum_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let config = AppConfig::load()?;
    let addr = config.bind_addr()?;
    info!("Starting zelene {} on {}", env!("CARGO_PKG_VERSION"), addr);

    let state = build_app_state(config).await?;
    let notifications = state.notifications.clone();

    let served = run_axum_server(state, addr).await;
    notifications.shutdown();

    if let Err(e) = &served {
        error!("Server stopped with error: {}", e);
    }
    served.context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}
