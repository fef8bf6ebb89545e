//! Confirmation emails for submitted queries.
//!
//! `NotificationService` is the single owner of the outbound transport. It is
//! created at startup, shared through `AppState`, and shut down once the HTTP
//! server has drained.

pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::core::shared::enums::QueryKind;

pub use smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("notification service is shut down")]
    ShutDown,
}

/// A rendered message ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError>;
}

pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    admin_copy: Option<String>,
    public_url: String,
    open: AtomicBool,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("admin_copy", &self.admin_copy)
            .field("public_url", &self.public_url)
            .field("open", &self.is_open())
            .finish()
    }
}

impl NotificationService {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        admin_copy: Option<String>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            admin_copy,
            public_url: public_url.into(),
            open: AtomicBool::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Stops accepting new sends. In-flight sends are not interrupted.
    pub fn shutdown(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!("Notification service shut down");
        }
    }

    pub fn lookup_url(&self, query_id: Uuid) -> String {
        format!(
            "{}/queries/lookup/{}",
            self.public_url.trim_end_matches('/'),
            query_id
        )
    }

    pub async fn send_confirmation(
        &self,
        kind: QueryKind,
        recipient_name: &str,
        recipient_email: &str,
        query_id: Uuid,
    ) -> Result<(), MailError> {
        if !self.is_open() {
            return Err(MailError::ShutDown);
        }

        let rendered = templates::confirmation(
            kind,
            recipient_name,
            query_id,
            &self.lookup_url(query_id),
        );
        let message = OutgoingEmail {
            to: recipient_email.to_string(),
            bcc: self.admin_copy.iter().cloned().collect(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        };

        match self.mailer.send(message).await {
            Ok(()) => {
                info!("Sent {} confirmation for {}", kind, query_id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send {} confirmation for {}: {}", kind, query_id, e);
                Err(e)
            }
        }
    }
}

/// Keeps every message in memory. Used by tests and by local runs without SMTP.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.fail.store(true, Ordering::Release);
        mailer
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: OutgoingEmail) -> Result<(), MailError> {
        if self.fail.load(Ordering::Acquire) {
            return Err(MailError::Transport("relay refused connection".into()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Transport("mailbox poisoned".into()))?
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(mailer: Arc<MemoryMailer>) -> NotificationService {
        NotificationService::new(
            mailer,
            Some("support@zelene.dev".into()),
            "https://zelene.dev/",
        )
    }

    #[tokio::test]
    async fn test_confirmation_carries_query_id() {
        let mailer = Arc::new(MemoryMailer::new());
        let notifications = service(mailer.clone());
        let id = Uuid::new_v4();

        notifications
            .send_confirmation(QueryKind::Support, "Ana", "ana@example.com", id)
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
        assert_eq!(sent[0].bcc, vec!["support@zelene.dev".to_string()]);
        assert!(sent[0].text.contains(&id.to_string()));
        assert!(sent[0].html.contains(&id.to_string()));
        assert!(sent[0]
            .text
            .contains(&format!("https://zelene.dev/queries/lookup/{}", id)));
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let mailer = Arc::new(MemoryMailer::new());
        let notifications = service(mailer.clone());
        notifications.shutdown();

        let err = notifications
            .send_confirmation(QueryKind::Contact, "Ana", "ana@example.com", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::ShutDown));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned() {
        let notifications = service(Arc::new(MemoryMailer::failing()));
        let err = notifications
            .send_confirmation(QueryKind::Feedback, "Ana", "ana@example.com", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Transport(_)));
    }
}
