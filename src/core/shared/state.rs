use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::shared::utils::DbPool;
use crate::drive::{AttachmentStore, MemoryAttachmentStore};
use crate::email::{MemoryMailer, NotificationService};
use crate::auth::DbAccountDirectory;
use crate::security::auth_api::{
    AccountDirectory, AuthConfig, AuthMiddlewareState, MemoryAccountDirectory,
};
use crate::security::captcha::CaptchaVerifier;
use crate::security::jwt::JwtManager;

/// Shared by every handler as `State<Arc<AppState>>`.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub notifications: Arc<NotificationService>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub captcha: CaptchaVerifier,
    pub jwt: Arc<JwtManager>,
    pub auth_config: Arc<AuthConfig>,
    pub accounts: Arc<dyn AccountDirectory>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("notifications", &self.notifications)
            .field("captcha_enabled", &self.captcha.is_enabled())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn auth_middleware_state(&self) -> AuthMiddlewareState {
        AuthMiddlewareState::new(
            Arc::clone(&self.auth_config),
            Arc::clone(&self.jwt),
            Arc::clone(&self.accounts),
        )
    }
}

/// Missing services fall back to in-memory ones and a lazily connecting pool.
pub struct AppStateBuilder {
    conn: Option<DbPool>,
    config: AppConfig,
    notifications: Option<Arc<NotificationService>>,
    attachments: Option<Arc<dyn AttachmentStore>>,
    accounts: Option<Arc<dyn AccountDirectory>>,
}

impl AppStateBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            conn: None,
            config,
            notifications: None,
            attachments: None,
            accounts: None,
        }
    }

    pub fn with_pool(mut self, pool: DbPool) -> Self {
        self.conn = Some(pool);
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<NotificationService>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn with_attachments(mut self, store: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = Some(store);
        self
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountDirectory>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Without a pool, account roles come from an empty in-memory directory.
    pub fn build(self) -> anyhow::Result<AppState> {
        let (conn, accounts) = match self.conn {
            Some(pool) => {
                let accounts = self.accounts.unwrap_or_else(|| {
                    Arc::new(DbAccountDirectory::new(pool.clone())) as Arc<dyn AccountDirectory>
                });
                (pool, accounts)
            }
            // Lazily connecting pool: nothing is opened until a handler asks.
            None => (
                Pool::builder()
                    .max_size(1)
                    .build_unchecked(ConnectionManager::<PgConnection>::new(&self.config.database.url)),
                self.accounts
                    .unwrap_or_else(|| Arc::new(MemoryAccountDirectory::new())),
            ),
        };
        let notifications = self.notifications.unwrap_or_else(|| {
            Arc::new(NotificationService::new(
                Arc::new(MemoryMailer::new()),
                None,
                self.config.server.public_url.clone(),
            ))
        });
        let attachments = self
            .attachments
            .unwrap_or_else(|| Arc::new(MemoryAttachmentStore::new()));
        let jwt = JwtManager::from_settings(&self.config.auth)?;

        Ok(AppState {
            conn,
            captcha: CaptchaVerifier::new(self.config.captcha.clone()),
            config: self.config,
            notifications,
            attachments,
            jwt: Arc::new(jwt),
            auth_config: Arc::new(AuthConfig::default()),
            accounts,
        })
    }
}
