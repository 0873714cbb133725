//! Transfer request configuration.
//!
//! A [`TransferConfig`] is built once per request and only borrowed after
//! that, so every attempt sees the same values. It can be assembled in code
//! or loaded from a JSON file:
//!
//! ```json
//! {
//!   "host": "files.example.com",
//!   "port": 22,
//!   "credentials": { "method": "password", "username": "deploy", "password": "..." },
//!   "local_path": "/var/backups/db.tar",
//!   "remote_path": "incoming/db.tar",
//!   "max_retries": 3,
//!   "retry_delay_ms": 5000
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use resume_upload_remote::{Credentials, Endpoint};
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};

/// Errors produced while loading or validating a [`TransferConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything one upload request needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    pub local_path: PathBuf,
    pub remote_path: String,
    /// Extra attempts after the first. Total attempts = `max_retries + 1`.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(
        rename = "retry_delay_ms",
        default = "default_retry_delay",
        with = "duration_ms"
    )]
    pub retry_delay: Duration,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay() -> Duration {
    DEFAULT_RETRY_DELAY
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl TransferConfig {
    /// Creates a config with default retry policy and chunk size.
    pub fn new(
        endpoint: Endpoint,
        credentials: Credentials,
        local_path: impl Into<PathBuf>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            credentials,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Upper bound on attempts: the first one plus `max_retries`.
    ///
    /// Widened to `u64` so `u32::MAX` retries still mean one more attempt.
    pub fn total_attempts(&self) -> u64 {
        u64::from(self.max_retries) + 1
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content)?;
        tracing::debug!(
            path = %path.display(),
            endpoint = %config.endpoint,
            remote = %config.remote_path,
            max_retries = config.max_retries,
            "loaded transfer config"
        );
        Ok(config)
    }

    /// Checks the fields no attempt could succeed without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host is empty".into()));
        }
        if self.endpoint.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.credentials.username().is_empty() {
            return Err(ConfigError::Invalid("username is empty".into()));
        }
        if self.local_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("local path is empty".into()));
        }
        if self.remote_path.is_empty() {
            return Err(ConfigError::Invalid("remote path is empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk size must be non-zero".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
