//! The resumable upload attempt.
//!
//! One attempt acquires, in order: session, client, local file, remote
//! handle. Each acquisition is its own scope; the scope's resource is
//! released after the inner scope returns, whatever it returned, so release
//! happens in reverse order on every exit path.

use std::io::SeekFrom;
use std::time::Instant;

use resume_upload_remote::{BoxFuture, RemoteClient, RemoteConnector, RemoteError, RemoteSession};
use tokio::io::AsyncSeekExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chunked::ChunkStreamer;
use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::progress::SpeedCalculator;
use crate::types::{AttemptReport, ResumeOffset, TransferProgress};

/// Runs one upload attempt for a config.
///
/// The retry loop depends on this trait rather than on the engine, so tests
/// can script attempt outcomes.
pub trait AttemptRunner: Send + Sync {
    fn run_attempt<'a>(
        &'a self,
        config: &'a TransferConfig,
    ) -> BoxFuture<'a, Result<AttemptReport, TransferError>>;
}

/// Uploads the part of the local file the remote side does not have yet.
pub struct ResumableTransferEngine<C> {
    connector: C,
    progress_tx: Option<mpsc::Sender<TransferProgress>>,
}

/// What the innermost scope produced; timing is added by the outer scope.
struct Streamed {
    resume_offset: ResumeOffset,
    local_size: u64,
    bytes_sent: u64,
}

impl<C: RemoteConnector> ResumableTransferEngine<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            progress_tx: None,
        }
    }

    /// Reports streaming progress on `tx` during every attempt.
    pub fn with_progress(mut self, tx: mpsc::Sender<TransferProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Runs one attempt: connect, reconcile offsets, append the remainder.
    pub async fn run(&self, config: &TransferConfig) -> Result<AttemptReport, TransferError> {
        let started = Instant::now();

        let mut session = self
            .connector
            .connect(&config.endpoint, &config.credentials)
            .await
            .map_err(TransferError::ConnectFailed)?;
        debug!(endpoint = %config.endpoint, "remote session established");

        let result = self.with_session(session.as_mut(), config).await;

        if let Err(e) = session.close().await {
            warn!(endpoint = %config.endpoint, error = %e, "failed to close remote session");
        }

        let streamed = result?;
        let report = AttemptReport {
            resume_offset: streamed.resume_offset,
            local_size: streamed.local_size,
            bytes_sent: streamed.bytes_sent,
            elapsed: started.elapsed(),
        };
        Ok(report)
    }

    async fn with_session(
        &self,
        session: &mut dyn RemoteSession,
        config: &TransferConfig,
    ) -> Result<Streamed, TransferError> {
        let client = session
            .init_client()
            .await
            .map_err(TransferError::ClientInitFailed)?;

        let result = self.with_client(client.as_ref(), config).await;

        if let Err(e) = client.close().await {
            warn!(error = %e, "failed to close remote file client");
        }
        result
    }

    async fn with_client(
        &self,
        client: &dyn RemoteClient,
        config: &TransferConfig,
    ) -> Result<Streamed, TransferError> {
        let mut local = tokio::fs::File::open(&config.local_path)
            .await
            .map_err(TransferError::LocalOpenFailed)?;
        let local_size = local
            .metadata()
            .await
            .map_err(TransferError::LocalOpenFailed)?
            .len();

        let remote_size = match client.stat(&config.remote_path).await {
            Ok(stat) => stat.size,
            Err(e) if e.is_not_found() => {
                debug!(remote = %config.remote_path, "remote file absent, starting from zero");
                0
            }
            Err(e) => return Err(TransferError::RemoteStatFailed(e)),
        };

        if remote_size > local_size {
            warn!(
                remote = %config.remote_path,
                remote_size,
                local_size,
                "remote file is larger than the local source, nothing to resume"
            );
        }
        let resume_offset = ResumeOffset::reconcile(remote_size, local_size);

        // Seeking past EOF is allowed; the copy then reads nothing.
        local
            .seek(SeekFrom::Start(resume_offset.bytes()))
            .await
            .map_err(TransferError::LocalSeekFailed)?;

        let mut remote = client
            .open_append(&config.remote_path)
            .await
            .map_err(TransferError::RemoteOpenFailed)?;

        if resume_offset.is_complete(local_size) {
            debug!(
                remote = %config.remote_path,
                offset = resume_offset.bytes(),
                "remote already holds the whole file"
            );
        } else {
            debug!(
                remote = %config.remote_path,
                offset = resume_offset.bytes(),
                remaining = resume_offset.remaining(local_size),
                "streaming remainder"
            );
        }

        let mut streamer = ChunkStreamer::new(config.chunk_size);
        if let Some(tx) = &self.progress_tx {
            streamer = streamer.with_progress(tx.clone());
        }
        let mut speed = SpeedCalculator::default();

        let copied = streamer
            .copy(
                &mut local,
                &mut remote,
                resume_offset.bytes(),
                local_size,
                &mut speed,
            )
            .await;
        let closed = remote.close().await;
        drop(local);

        if let (Err(_), Err(e)) = (&copied, &closed) {
            warn!(
                remote = %config.remote_path,
                error = %e,
                "failed to close remote file after copy error"
            );
        }
        let bytes_sent = copied.map_err(TransferError::CopyFailed)?;
        closed.map_err(|e| TransferError::CopyFailed(into_io_error(e)))?;

        info!(
            remote = %config.remote_path,
            offset = resume_offset.bytes(),
            bytes = bytes_sent,
            bytes_per_sec = speed.bytes_per_second() as u64,
            "upload attempt streamed remainder"
        );

        Ok(Streamed {
            resume_offset,
            local_size,
            bytes_sent,
        })
    }
}

impl<C: RemoteConnector> AttemptRunner for ResumableTransferEngine<C> {
    fn run_attempt<'a>(
        &'a self,
        config: &'a TransferConfig,
    ) -> BoxFuture<'a, Result<AttemptReport, TransferError>> {
        Box::pin(self.run(config))
    }
}

fn into_io_error(e: RemoteError) -> std::io::Error {
    match e {
        RemoteError::Io(io) => io,
        other => std::io::Error::other(other),
    }
}
