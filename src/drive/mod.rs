//! Attachment storage for technical issue reports.

pub mod attachments;
pub mod s3;

use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::core::shared::error::ApiError;

pub use attachments::{
    check_attachment_list, decode_attachment, sanitize_file_name, AttachmentInput,
    DecodedAttachment, ALLOWED_CONTENT_TYPES, MAX_ATTACHMENTS, MAX_ATTACHMENT_BYTES,
    MAX_ISSUE_BODY_BYTES,
};
pub use s3::S3AttachmentStore;

pub const ISSUE_ATTACHMENT_PREFIX: &str = "technical-issues";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },
    #[error("could not resolve URL for {key}: {reason}")]
    Url { key: String, reason: String },
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::internal(err)
    }
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// A URL an admin browser can open: public, or presigned and short-lived.
    async fn url_for(&self, key: &str) -> Result<String, StorageError>;
}

pub fn attachment_key(file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        ISSUE_ATTACHMENT_PREFIX,
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

/// Uploads every attachment concurrently. The first failure fails the batch.
pub async fn upload_attachments(
    store: &dyn AttachmentStore,
    files: Vec<DecodedAttachment>,
) -> Result<Vec<String>, StorageError> {
    let uploads = files.into_iter().map(|file| async move {
        let key = attachment_key(&file.file_name);
        let size = file.bytes.len();
        store.put(&key, file.bytes, &file.content_type).await?;
        info!("Stored attachment {} ({} bytes)", key, size);
        Ok::<_, StorageError>(key)
    });
    try_join_all(uploads).await
}

pub async fn resolve_urls(
    store: &dyn AttachmentStore,
    keys: &[String],
) -> Result<Vec<String>, StorageError> {
    try_join_all(keys.iter().map(|key| store.url_for(key))).await
}

/// In-process store for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryAttachmentStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    fail_uploads: AtomicBool,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_uploads.store(true, Ordering::Release);
        store
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let upload_error = |reason: &str| StorageError::Upload {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if self.fail_uploads.load(Ordering::Acquire) {
            return Err(upload_error("bucket unavailable"));
        }
        self.objects
            .lock()
            .map_err(|_| upload_error("store poisoned"))?
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn url_for(&self, key: &str) -> Result<String, StorageError> {
        Ok(format!("memory://{}", key))
    }
}
