use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Credentials},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client as S3Client,
};
use std::time::Duration;

use super::{AttachmentStore, StorageError};
use crate::config::StorageConfig;

pub async fn create_s3_client(config: &StorageConfig) -> S3Client {
    let endpoint = if config.endpoint.ends_with('/') {
        config.endpoint.clone()
    } else {
        format!("{}/", config.endpoint)
    };
    let base_config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .region(aws_config::Region::new(config.region.clone()))
        .credentials_provider(Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static",
        ))
        .load()
        .await;
    let s3_config = S3ConfigBuilder::from(&base_config)
        .force_path_style(true)
        .build();
    S3Client::from_conf(s3_config)
}

#[derive(Debug, Clone)]
pub struct S3AttachmentStore {
    client: S3Client,
    bucket: String,
    public_base_url: Option<String>,
    presign_ttl: Duration,
}

impl S3AttachmentStore {
    pub fn new(client: S3Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            public_base_url: config
                .public_base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            presign_ttl: Duration::from_secs(config.presign_ttl_secs.max(1)),
        }
    }

    pub async fn from_config(config: &StorageConfig) -> Self {
        let client = create_s3_client(config).await;
        Self::new(client, config)
    }
}

#[async_trait]
impl AttachmentStore for S3AttachmentStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn url_for(&self, key: &str) -> Result<String, StorageError> {
        if let Some(base) = &self.public_base_url {
            return Ok(format!("{}/{}", base, key));
        }

        let url_error = |reason: String| StorageError::Url {
            key: key.to_string(),
            reason,
        };
        let presigning =
            PresigningConfig::expires_in(self.presign_ttl).map_err(|e| url_error(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| url_error(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}
