//! Data types for the retry loop.

use std::time::Duration;

use resume_upload_transfer::{AttemptReport, FailureKind};

/// Successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    /// Attempts made, including the successful one (1-based).
    pub attempts: u64,
    /// Report of the successful attempt.
    pub report: AttemptReport,
}

/// Lifecycle event emitted by the retry loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// An attempt is starting.
    AttemptStarted { attempt: u64, total_attempts: u64 },
    /// An attempt failed. One per failed attempt.
    AttemptFailed {
        attempt: u64,
        max_retries: u32,
        kind: FailureKind,
        error: String,
    },
    /// The loop is about to sleep before the next attempt.
    RetryScheduled { next_attempt: u64, delay: Duration },
    /// The upload finished.
    Completed { attempts: u64, bytes_sent: u64 },
    /// No attempts left.
    Exhausted { attempts: u64, max_retries: u32 },
}
