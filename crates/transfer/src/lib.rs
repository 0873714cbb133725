//! One resumable upload attempt.
//!
//! [`ResumableTransferEngine`] connects through a
//! [`RemoteConnector`](resume_upload_remote::RemoteConnector), stats the
//! remote destination, seeks the local source past the bytes already
//! present, and appends the remainder in chunks. It knows nothing about
//! retries: a failed attempt is reported as a step-classified
//! [`TransferError`] and every resource is released before returning.

mod chunked;
mod config;
mod engine;
mod error;
mod progress;
mod types;

pub use chunked::ChunkStreamer;
pub use config::{ConfigError, TransferConfig};
pub use engine::{AttemptRunner, ResumableTransferEngine};
pub use error::{FailureKind, TransferError};
pub use progress::SpeedCalculator;
pub use types::{AttemptReport, ResumeOffset, TransferProgress};

/// Default streaming chunk size: 256 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default number of extra attempts after the first.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);
