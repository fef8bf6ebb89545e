//! Startup wiring: logging, database, services.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core::shared::state::{AppState, AppStateBuilder};
use crate::core::shared::utils::{create_conn, run_migrations};
use crate::drive::S3AttachmentStore;
use crate::email::{NotificationService, SmtpMailer};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zelene=debug,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Builds every long-lived service. Fails fast on bad configuration.
pub async fn build_app_state(config: AppConfig) -> Result<Arc<AppState>> {
    let pool = create_conn(&config.database).context("Failed to create database pool")?;
    if config.database.run_migrations {
        let migration_pool = pool.clone();
        tokio::task::spawn_blocking(move || run_migrations(&migration_pool))
            .await
            .context("Migration task panicked")??;
        info!("Database migrations are up to date");
    } else {
        warn!("Skipping database migrations (database.run_migrations = false)");
    }

    let mailer = SmtpMailer::from_config(&config.smtp).context("Failed to configure SMTP")?;
    let notifications = Arc::new(NotificationService::new(
        Arc::new(mailer),
        config.smtp.admin_copy.clone(),
        config.server.public_url.clone(),
    ));
    info!("Notification service ready (smtp host {})", config.smtp.host);

    let attachments = S3AttachmentStore::from_config(&config.storage).await;
    info!(
        "Attachment store ready (bucket {} at {})",
        config.storage.bucket, config.storage.endpoint
    );

    if !config.captcha.enabled {
        warn!("Captcha verification is disabled");
    }

    let state = AppStateBuilder::new(config)
        .with_pool(pool)
        .with_notifications(notifications)
        .with_attachments(Arc::new(attachments))
        .build()?;
    Ok(Arc::new(state))
}
