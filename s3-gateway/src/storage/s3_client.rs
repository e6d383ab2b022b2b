//! S3-compatible object storage backend
//!
//! Talks to AWS S3 or a compatible service (MinIO, DigitalOcean Spaces,
//! etc.) through `aws-sdk-s3`. SDK errors are flattened into `BackendError`
//! here so nothing above this module depends on SDK types.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{retry::RetryConfig, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{timeout::TimeoutConfig, Region};
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client};
use bytes::Bytes;
use tracing::{debug, info};

use super::{BackendError, BackendFactory, ObjectStore};
use crate::config::StorageConfig;

const CREDENTIALS_PROVIDER_NAME: &str = "S3GatewayStaticCredentials";

/// S3 client bound to one bucket
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    /// Build an SDK client from configuration
    pub async fn connect(config: &StorageConfig) -> Self {
        info!("Initializing S3 client for bucket: {}", config.bucket);

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.operation_timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts))
            .timeout_config(timeouts);

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            debug!("Using static credentials for S3 client");
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None, // No session token
                None, // No expiry
                CREDENTIALS_PROVIDER_NAME,
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            loader = loader.endpoint_url(endpoint.clone());
        }

        let shared_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(config.force_path_style)
            .build();

        Self::from_client(Client::from_conf(s3_config), config.bucket.clone())
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn sdk_failure<E: std::error::Error>(err: E) -> BackendError {
    BackendError::Backend(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStore for S3Backend {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), BackendError> {
        debug!("Uploading file to S3: {} ({} bytes)", key, data.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(sdk_failure)?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BackendError> {
        debug!("Downloading file from S3: {}", key);

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    debug!("File not found in S3: {}", key);
                    return Err(BackendError::NoSuchKey(key.to_string()));
                }
                return Err(sdk_failure(err));
            }
        };

        let data = output.body.collect().await.map_err(sdk_failure)?;
        Ok(data.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> Result<(), BackendError> {
        debug!("Deleting file from S3: {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_failure)?;

        Ok(())
    }
}

/// Builds an `S3Backend` from the storage configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Factory;

#[async_trait]
impl BackendFactory for S3Factory {
    async fn connect(&self, config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, BackendError> {
        let backend: Arc<dyn ObjectStore> = Arc::new(S3Backend::connect(config).await);
        Ok(backend)
    }
}
