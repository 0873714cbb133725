//! End-to-end uploads against a directory-backed remote that drops the
//! connection on demand.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use resume_upload::{
    Credentials, Endpoint, LocalDirConnector, RemoteConnector, RemoteError, RetryOrchestrator,
    ResumableTransferEngine, TransferConfig, UploadError, UploadEvent, upload_file,
};
use resume_upload_remote::{BoxFuture, RemoteClient, RemoteFile, RemoteSession, RemoteStat};
use tempfile::TempDir;
use tokio::io::AsyncWrite;

/// What the flaky connector does on a given connection.
#[derive(Debug, Clone, Copy)]
enum Fault {
    RefuseConnect,
    ResetAfter(usize),
}

/// Wraps [`LocalDirConnector`] and injects one fault per scripted connection.
/// Connections past the end of the script behave normally.
struct FlakyConnector {
    inner: LocalDirConnector,
    script: Vec<Fault>,
    connects: AtomicU32,
}

impl FlakyConnector {
    fn new(inner: LocalDirConnector, script: Vec<Fault>) -> Self {
        Self {
            inner,
            script,
            connects: AtomicU32::new(0),
        }
    }
}

impl RemoteConnector for FlakyConnector {
    fn connect<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteSession>, RemoteError>> {
        Box::pin(async move {
            let n = self.connects.fetch_add(1, Ordering::SeqCst) as usize;
            let budget = match self.script.get(n) {
                Some(Fault::RefuseConnect) => {
                    return Err(RemoteError::Connect("connection refused".into()));
                }
                Some(Fault::ResetAfter(bytes)) => Some(*bytes),
                None => None,
            };
            let inner = self.inner.connect(endpoint, credentials).await?;
            Ok(Box::new(FlakySession { inner, budget }) as Box<dyn RemoteSession>)
        })
    }
}

struct FlakySession {
    inner: Box<dyn RemoteSession>,
    budget: Option<usize>,
}

impl RemoteSession for FlakySession {
    fn init_client(&mut self) -> BoxFuture<'_, Result<Box<dyn RemoteClient>, RemoteError>> {
        Box::pin(async move {
            let inner = self.inner.init_client().await?;
            Ok(Box::new(FlakyClient {
                inner,
                budget: self.budget,
            }) as Box<dyn RemoteClient>)
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>> {
        self.inner.close()
    }
}

struct FlakyClient {
    inner: Box<dyn RemoteClient>,
    budget: Option<usize>,
}

impl RemoteClient for FlakyClient {
    fn stat<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RemoteStat, RemoteError>> {
        self.inner.stat(path)
    }

    fn open_append<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteFile>, RemoteError>> {
        Box::pin(async move {
            let inner = self.inner.open_append(path).await?;
            Ok(Box::new(FlakyFile {
                inner,
                budget: self.budget,
            }) as Box<dyn RemoteFile>)
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>> {
        self.inner.close()
    }
}

/// Accepts `budget` bytes, then fails like a dropped connection.
struct FlakyFile {
    inner: Box<dyn RemoteFile>,
    budget: Option<usize>,
}

impl AsyncWrite for FlakyFile {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let allowed = match this.budget {
            Some(0) => return Poll::Ready(Err(io::ErrorKind::ConnectionReset.into())),
            Some(left) => left.min(buf.len()),
            None => buf.len(),
        };
        match Pin::new(&mut this.inner).poll_write(cx, &buf[..allowed]) {
            Poll::Ready(Ok(n)) => {
                if let Some(left) = this.budget.as_mut() {
                    *left -= n;
                }
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl RemoteFile for FlakyFile {
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>> {
        self.inner.close()
    }
}

fn sample_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn config(local: &std::path::Path, remote: &str, max_retries: u32) -> TransferConfig {
    TransferConfig::new(
        Endpoint::new("files.example.com", 22),
        Credentials::password("deploy", "secret"),
        local,
        remote,
    )
    .with_max_retries(max_retries)
    .with_retry_delay(Duration::from_millis(5))
    .with_chunk_size(1024)
}

#[tokio::test]
async fn interrupted_upload_resumes_where_remote_stopped() {
    let local_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let data = sample_data(10_000);
    let local = local_dir.path().join("backup.tar");
    std::fs::write(&local, &data).unwrap();

    let connector = FlakyConnector::new(
        LocalDirConnector::new(remote_dir.path()),
        vec![Fault::RefuseConnect, Fault::ResetAfter(4000)],
    );
    let mut orch = RetryOrchestrator::new(ResumableTransferEngine::new(connector));
    let mut events = orch.take_events().unwrap();

    let outcome = orch
        .run_with_retry(&config(&local, "incoming/backup.tar", 3))
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.report.resume_offset.bytes(), 4000);
    assert_eq!(outcome.report.bytes_sent, 6000);

    let remote = std::fs::read(remote_dir.path().join("incoming/backup.tar")).unwrap();
    assert_eq!(remote.len(), data.len());
    assert_eq!(remote, data);

    let mut failed_kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let UploadEvent::AttemptFailed { kind, .. } = event {
            failed_kinds.push(kind);
        }
    }
    assert_eq!(
        failed_kinds,
        vec![resume_upload::FailureKind::Connect, resume_upload::FailureKind::Copy]
    );
}

#[tokio::test]
async fn repeated_interruptions_never_duplicate_bytes() {
    let local_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let data = sample_data(5_000);
    let local = local_dir.path().join("blob.bin");
    std::fs::write(&local, &data).unwrap();

    let connector = FlakyConnector::new(
        LocalDirConnector::new(remote_dir.path()),
        vec![
            Fault::ResetAfter(1000),
            Fault::ResetAfter(1),
            Fault::ResetAfter(0),
            Fault::ResetAfter(2500),
        ],
    );

    let outcome = upload_file(&config(&local, "blob.bin", 4), connector)
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 5);
    assert_eq!(outcome.report.resume_offset.bytes(), 3501);
    let remote = std::fs::read(remote_dir.path().join("blob.bin")).unwrap();
    assert_eq!(remote, data);
}

#[tokio::test]
async fn partial_remote_from_earlier_run_is_completed() {
    let local_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let data = sample_data(3_000);
    let local = local_dir.path().join("blob.bin");
    std::fs::write(&local, &data).unwrap();
    std::fs::write(remote_dir.path().join("blob.bin"), &data[..1234]).unwrap();

    let outcome = upload_file(
        &config(&local, "blob.bin", 0),
        LocalDirConnector::new(remote_dir.path()),
    )
    .await
    .unwrap();

    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.report.resume_offset.bytes(), 1234);
    assert_eq!(outcome.report.bytes_sent, 3000 - 1234);
    assert_eq!(std::fs::read(remote_dir.path().join("blob.bin")).unwrap(), data);
}

#[tokio::test]
async fn unreachable_host_exhausts_retries() {
    let local_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let local = local_dir.path().join("blob.bin");
    std::fs::write(&local, b"payload").unwrap();

    let connector = FlakyConnector::new(
        LocalDirConnector::new(remote_dir.path()),
        vec![Fault::RefuseConnect; 3],
    );

    let err = upload_file(&config(&local, "blob.bin", 2), connector)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "upload failed after 2 attempts");
    match err {
        UploadError::RetriesExhausted {
            attempts,
            last_error,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_error.kind(), resume_upload::FailureKind::Connect);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!remote_dir.path().join("blob.bin").exists());
}

#[tokio::test]
async fn invalid_config_makes_no_attempt() {
    let remote_dir = TempDir::new().unwrap();
    let connector = FlakyConnector::new(LocalDirConnector::new(remote_dir.path()), vec![]);
    let cfg = config(std::path::Path::new("local.bin"), "", 3);

    let err = upload_file(&cfg, connector).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidConfig(_)));
}

#[tokio::test]
async fn concurrent_uploads_are_independent() {
    let local_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let a = sample_data(4_096);
    let b: Vec<u8> = sample_data(2_048).into_iter().rev().collect();
    let local_a = local_dir.path().join("a.bin");
    let local_b = local_dir.path().join("b.bin");
    std::fs::write(&local_a, &a).unwrap();
    std::fs::write(&local_b, &b).unwrap();

    let cfg_a = config(&local_a, "a.bin", 1);
    let cfg_b = config(&local_b, "b.bin", 1);
    let (ra, rb) = tokio::join!(
        upload_file(&cfg_a, LocalDirConnector::new(remote_dir.path())),
        upload_file(&cfg_b, LocalDirConnector::new(remote_dir.path())),
    );

    assert_eq!(ra.unwrap().report.bytes_sent, 4_096);
    assert_eq!(rb.unwrap().report.bytes_sent, 2_048);
    assert_eq!(std::fs::read(remote_dir.path().join("a.bin")).unwrap(), a);
    assert_eq!(std::fs::read(remote_dir.path().join("b.bin")).unwrap(), b);
}
