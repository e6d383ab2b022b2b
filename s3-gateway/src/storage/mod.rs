//! Object storage layer
//!
//! This module provides:
//! - The `ObjectStore` seam every backend implements (S3, in-memory)
//! - `BackendFactory`, which builds a backend handle from configuration
//! - `StorageClient`, the wrapper handlers talk to: it validates keys,
//!   applies the key prefix, owns the lazily-built handle and translates
//!   backend failures into typed `StorageError`s

pub mod client;
pub mod memory;
pub mod s3_client;

pub use client::StorageClient;
pub use memory::{MemoryBackend, MemoryFactory};
pub use s3_client::{S3Backend, S3Factory};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::StorageConfig;

/// Failures reported by a backend. SDK error types stop here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("No such key: {0}")]
    NoSuchKey(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Byte storage addressed by key inside one bucket.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create or overwrite the object at `key`.
    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), BackendError>;

    /// Fetch the whole object. Missing keys yield `BackendError::NoSuchKey`.
    async fn get_object(&self, key: &str) -> Result<Bytes, BackendError>;

    /// Remove the object. Removing a missing key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), BackendError>;
}

/// Builds the long-lived backend handle the first time it is needed.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn connect(&self, config: &StorageConfig) -> Result<Arc<dyn ObjectStore>, BackendError>;
}
