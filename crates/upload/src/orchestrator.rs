//! Retry orchestrator.
//!
//! Runs attempts one after another, sleeping a fixed delay between failed
//! ones. Every attempt error counts as retriable; the loop only looks at
//! whether an attempt succeeded.

use resume_upload_transfer::{AttemptRunner, TransferConfig};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::UploadError;
use crate::types::{UploadEvent, UploadOutcome};

/// Drives attempts of an [`AttemptRunner`] under a fixed-delay retry policy.
pub struct RetryOrchestrator<R> {
    runner: R,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl<R: AttemptRunner> RetryOrchestrator<R> {
    /// Creates a new orchestrator around `runner`.
    pub fn new(runner: R) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            runner,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are dropped rather than awaited when nobody drains them.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs up to `config.max_retries + 1` attempts.
    ///
    /// Returns on the first success. After a failure, sleeps
    /// `config.retry_delay` if another attempt is allowed; the last failure
    /// returns immediately with [`UploadError::RetriesExhausted`].
    pub async fn run_with_retry(
        &self,
        config: &TransferConfig,
    ) -> Result<UploadOutcome, UploadError> {
        let max_retries = config.max_retries;
        let total_attempts = config.total_attempts();
        let mut attempt: u64 = 0;

        let last_error = loop {
            attempt += 1;
            self.emit(UploadEvent::AttemptStarted {
                attempt,
                total_attempts,
            });

            match self.runner.run_attempt(config).await {
                Ok(report) => {
                    info!(
                        remote = %config.remote_path,
                        attempt,
                        offset = report.resume_offset.bytes(),
                        bytes = report.bytes_sent,
                        "upload completed"
                    );
                    self.emit(UploadEvent::Completed {
                        attempts: attempt,
                        bytes_sent: report.bytes_sent,
                    });
                    return Ok(UploadOutcome {
                        attempts: attempt,
                        report,
                    });
                }
                Err(e) => {
                    warn!(
                        remote = %config.remote_path,
                        attempt,
                        max_retries,
                        error = %e,
                        "upload attempt failed"
                    );
                    self.emit(UploadEvent::AttemptFailed {
                        attempt,
                        max_retries,
                        kind: e.kind(),
                        error: e.to_string(),
                    });

                    if attempt >= total_attempts {
                        break e;
                    }

                    self.emit(UploadEvent::RetryScheduled {
                        next_attempt: attempt + 1,
                        delay: config.retry_delay,
                    });
                    tokio::time::sleep(config.retry_delay).await;
                }
            }
        };

        error!(
            remote = %config.remote_path,
            attempts = attempt,
            max_retries,
            error = %last_error,
            "upload failed, retries exhausted"
        );
        self.emit(UploadEvent::Exhausted {
            attempts: attempt,
            max_retries,
        });

        Err(UploadError::RetriesExhausted {
            attempts: attempt,
            max_retries,
            last_error,
        })
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.events_tx.try_send(event);
    }
}
