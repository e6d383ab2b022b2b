//! In-memory backend for local development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BackendError, BackendFactory, ObjectStore};
use crate::config::StorageConfig;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), BackendError> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BackendError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NoSuchKey(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BackendError> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

/// Hands out the same `MemoryBackend` on every connect.
#[derive(Debug, Clone, Default)]
pub struct MemoryFactory {
    backend: Arc<MemoryBackend>,
}

impl MemoryFactory {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl BackendFactory for MemoryFactory {
    async fn connect(&self, _config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, BackendError> {
        let handle: Arc<dyn ObjectStore> = self.backend.clone();
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let backend = MemoryBackend::new();
        backend.put_object("a.txt", Bytes::from_static(b"one")).await.unwrap();
        backend.put_object("a.txt", Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(backend.get_object("a.txt").await.unwrap(), Bytes::from_static(b"two"));
        assert_eq!(backend.keys().await, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let backend = MemoryBackend::new();
        assert_eq!(
            backend.get_object("nope").await,
            Err(BackendError::NoSuchKey("nope".to_string()))
        );
        // Deleting something that is not there mirrors S3 and succeeds
        assert!(backend.delete_object("nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_factory_shares_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let factory = MemoryFactory::new(backend.clone());

        let handle = factory.connect(&StorageConfig::default()).await.unwrap();
        handle.put_object("k", Bytes::from_static(b"v")).await.unwrap();

        assert_eq!(backend.keys().await, vec!["k".to_string()]);
    }
}
