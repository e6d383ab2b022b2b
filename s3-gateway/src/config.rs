//! Configuration for the S3 gateway
//!
//! Settings come from environment variables (a `.env` file is honored by
//! `main`). Every setting except the bucket has a default.

use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingField(String),
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any name -> value source
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            storage: StorageConfig::from_lookup(&lookup)?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for request bodies, multipart uploads included
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8085,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    fn from_lookup<F>(lookup: &F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_or(lookup, "SERVER_PORT", defaults.port)?,
            max_upload_bytes: parse_or(lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("SERVER_PORT must be non-zero".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("MAX_UPLOAD_BYTES must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which object store the gateway talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    S3,
    Memory,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(BackendKind::S3),
            "memory" => Ok(BackendKind::Memory),
            other => Err(ConfigError::InvalidValue {
                name: "STORAGE_BACKEND".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Object storage configuration
#[derive(Clone)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible services (MinIO etc.)
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Root prepended to every object key; empty or ending in `/`
    pub key_prefix: String,
    pub operation_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub max_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::S3,
            region: "us-east-1".to_string(),
            bucket: String::new(),
            endpoint: None,
            force_path_style: false,
            access_key_id: None,
            secret_access_key: None,
            key_prefix: String::new(),
            operation_timeout_seconds: 30,
            connect_timeout_seconds: 5,
            max_attempts: 3,
        }
    }
}

// Hand-written so the secret key never reaches a log line
impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<set>"))
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("key_prefix", &self.key_prefix)
            .field("operation_timeout_seconds", &self.operation_timeout_seconds)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl StorageConfig {
    fn from_lookup<F>(lookup: &F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            backend: parse_or(lookup, "STORAGE_BACKEND", defaults.backend)?,
            region: non_blank(lookup, "S3_REGION").unwrap_or(defaults.region),
            bucket: non_blank(lookup, "S3_BUCKET").unwrap_or(defaults.bucket),
            endpoint: non_blank(lookup, "S3_ENDPOINT"),
            force_path_style: parse_or(lookup, "S3_FORCE_PATH_STYLE", defaults.force_path_style)?,
            access_key_id: non_blank(lookup, "S3_ACCESS_KEY_ID"),
            secret_access_key: non_blank(lookup, "S3_SECRET_ACCESS_KEY"),
            key_prefix: normalize_prefix(&lookup("S3_KEY_PREFIX").unwrap_or_default()),
            operation_timeout_seconds: parse_or(
                lookup,
                "S3_OPERATION_TIMEOUT_SECS",
                defaults.operation_timeout_seconds,
            )?,
            connect_timeout_seconds: parse_or(
                lookup,
                "S3_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_seconds,
            )?,
            max_attempts: parse_or(lookup, "S3_MAX_ATTEMPTS", defaults.max_attempts)?,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.backend == BackendKind::S3 && self.bucket.trim().is_empty() {
            return Err(ConfigError::MissingField("S3_BUCKET".to_string()));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigError::Invalid(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together".to_string(),
            ));
        }
        if self.operation_timeout_seconds == 0 || self.connect_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("S3 timeouts must be non-zero".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("S3_MAX_ATTEMPTS must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

/// `images`, `/images/` and `images/` all become `images/`.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_blank(lookup, name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
