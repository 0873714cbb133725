use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::DEFAULT_CHUNK_SIZE;
use crate::progress::SpeedCalculator;
use crate::types::TransferProgress;

/// Copies a reader into a writer in fixed-size chunks, reporting progress.
pub struct ChunkStreamer {
    chunk_size: usize,
    progress_tx: Option<mpsc::Sender<TransferProgress>>,
}

impl ChunkStreamer {
    /// Creates a streamer.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            chunk_size,
            progress_tx: None,
        }
    }

    /// Sends a [`TransferProgress`] after every chunk. Never blocks the copy:
    /// updates are dropped when the channel is full.
    pub fn with_progress(mut self, tx: mpsc::Sender<TransferProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Streams `reader` into `writer` until `reader` is exhausted, then flushes.
    ///
    /// `start_offset` is the reader's absolute position and `total_bytes` the
    /// source size; both only feed progress reports. Returns bytes written.
    pub async fn copy<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        start_offset: u64,
        total_bytes: u64,
        speed: &mut SpeedCalculator,
    ) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut buf = vec![0u8; self.chunk_size];
        let mut sent: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            writer.write_all(&buf[..n]).await?;
            sent += n as u64;
            speed.add_sample(n as u64);

            let progress = TransferProgress {
                bytes_sent: sent,
                offset: start_offset + sent,
                total_bytes,
            };
            debug!(
                offset = progress.offset,
                percent = (progress.fraction() * 100.0) as u32,
                eta_secs = speed
                    .eta(total_bytes.saturating_sub(progress.offset))
                    .map(|eta| eta.as_secs()),
                "chunk written"
            );
            if let Some(tx) = &self.progress_tx {
                let _ = tx.try_send(progress);
            }
        }

        writer.flush().await?;
        Ok(sent)
    }
}
