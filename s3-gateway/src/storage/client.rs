use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::{BackendError, BackendFactory, ObjectStore};
use crate::config::StorageConfig;
use crate::error::{StorageError, BLANK_KEY_MESSAGE, INVALID_FILE_MESSAGE};

/// Wrapper the handlers use for every storage call.
///
/// Owns the storage configuration and a backend handle that is built on
/// first use and then shared. Keys handed in by callers are relative; the
/// configured prefix is applied here so every operation agrees on where an
/// object lives.
pub struct StorageClient {
    config: StorageConfig,
    factory: Arc<dyn BackendFactory>,
    handle: OnceCell<Arc<dyn ObjectStore>>,
}

impl StorageClient {
    pub fn new(config: StorageConfig, factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            config,
            factory,
            handle: OnceCell::new(),
        }
    }

    /// Returns the backend handle, building it on the first call.
    ///
    /// Concurrent first callers wait on the same construction. A failed
    /// construction is not cached, so the next call tries again.
    pub async fn client(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                info!(
                    bucket = %self.config.bucket,
                    region = %self.config.region,
                    "Initializing storage client"
                );
                self.factory.connect(&self.config).await.map_err(|e| {
                    error!("Failed to initialize storage client: {}", e);
                    StorageError::Connect(e)
                })
            })
            .await?;

        Ok(Arc::clone(handle))
    }

    /// Upload `data` under `key`, overwriting any existing object.
    pub async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        require_key(key)?;

        let object_key = self.object_key(key);
        debug!("Uploading {} ({} bytes)", object_key, data.len());

        self.client()
            .await?
            .put_object(&object_key, data)
            .await
            .map_err(|source| StorageError::Upload {
                key: key.to_string(),
                source,
            })?;

        info!("File uploaded to storage with key: {}", object_key);
        Ok(())
    }

    /// Like `put`, but an empty payload is rejected.
    pub async fn replace(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        require_key(key)?;
        if data.is_empty() {
            return Err(StorageError::InvalidArgument(INVALID_FILE_MESSAGE.to_string()));
        }

        let object_key = self.object_key(key);
        self.client()
            .await?
            .put_object(&object_key, data)
            .await
            .map_err(|source| StorageError::Upload {
                key: key.to_string(),
                source,
            })?;

        info!("File replaced in storage with key: {}", object_key);
        Ok(())
    }

    /// Download the whole object stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        require_key(key)?;

        let object_key = self.object_key(key);
        match self.client().await?.get_object(&object_key).await {
            Ok(data) => {
                debug!("Downloaded {} ({} bytes)", object_key, data.len());
                Ok(data)
            }
            Err(BackendError::NoSuchKey(_)) => Err(StorageError::NotFound(key.to_string())),
            Err(source) => Err(StorageError::Download {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Remove the object under `key`. Missing objects are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        require_key(key)?;

        let object_key = self.object_key(key);
        self.client()
            .await?
            .delete_object(&object_key)
            .await
            .map_err(|source| StorageError::Deletion {
                key: key.to_string(),
                source,
            })?;

        info!("File deleted from storage with key: {}", object_key);
        Ok(())
    }

    /// Summary of where objects go. Never includes credentials.
    pub fn info(&self) -> String {
        format!(
            "Region: {} | Bucket: {} | Endpoint: {} | Prefix: {} | Credentials: {}",
            self.config.region,
            self.config.bucket,
            self.config.endpoint.as_deref().unwrap_or("default"),
            if self.config.key_prefix.is_empty() {
                "(none)"
            } else {
                self.config.key_prefix.as_str()
            },
            if self.config.has_static_credentials() {
                "static"
            } else {
                "provider chain"
            },
        )
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }
}

fn require_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidArgument(BLANK_KEY_MESSAGE.to_string()));
    }
    Ok(())
}
