//! Resumable file upload with bounded retries.
//!
//! Lands a local file on a remote host through any
//! [`RemoteConnector`]. Each attempt resumes from however many bytes the
//! remote file already holds; failed attempts are retried after a fixed
//! delay until the configured retry budget runs out.
//!
//! # Pipeline
//!
//! 1. **Attempt**: [`ResumableTransferEngine`] connects, stats the remote
//!    file, seeks the local file and appends the remainder
//! 2. **Classify**: any attempt error is retriable
//! 3. **Wait**: sleep `retry_delay` (never after the last attempt)
//! 4. **Report**: [`UploadOutcome`] or [`UploadError::RetriesExhausted`]

pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::UploadError;
pub use orchestrator::RetryOrchestrator;
pub use types::{UploadEvent, UploadOutcome};

pub use resume_upload_remote::{
    Credentials, Endpoint, LocalDirConnector, RemoteConnector, RemoteError,
};
pub use resume_upload_transfer::{
    AttemptReport, AttemptRunner, ConfigError, FailureKind, ResumableTransferEngine,
    ResumeOffset, TransferConfig, TransferError, TransferProgress,
};

/// Uploads `config.local_path` to `config.remote_path`, resuming and retrying.
///
/// Validates the config, then runs up to `config.max_retries + 1` attempts
/// through `connector`.
pub async fn upload_file<C: RemoteConnector>(
    config: &TransferConfig,
    connector: C,
) -> Result<UploadOutcome, UploadError> {
    config.validate()?;
    let orchestrator = RetryOrchestrator::new(ResumableTransferEngine::new(connector));
    orchestrator.run_with_retry(config).await
}
