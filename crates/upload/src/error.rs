//! Upload error types.

use resume_upload_transfer::{ConfigError, TransferError};

/// Terminal errors returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Every allowed attempt failed.
    ///
    /// The message counts configured retries, not attempts; `attempts` holds
    /// the real number of attempts made (`max_retries + 1`).
    #[error("upload failed after {max_retries} attempts")]
    RetriesExhausted {
        attempts: u64,
        max_retries: u32,
        #[source]
        last_error: TransferError,
    },

    #[error("invalid transfer config: {0}")]
    InvalidConfig(#[from] ConfigError),
}
