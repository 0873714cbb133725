//! Directory-backed remote store.
//!
//! Treats a local directory as the remote filesystem root. Remote paths are
//! relative to that root and validated against traversal. Useful for
//! loopback deployments (e.g. a mounted share) and for exercising the
//! upload engine without a network.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::{
    BoxFuture, Credentials, Endpoint, RemoteClient, RemoteConnector, RemoteError, RemoteFile,
    RemoteSession, RemoteStat,
};

/// Connector whose "remote host" is a local directory.
///
/// The endpoint and credentials are accepted for interface parity and only
/// logged; no authentication takes place.
#[derive(Debug, Clone)]
pub struct LocalDirConnector {
    root: PathBuf,
}

impl LocalDirConnector {
    /// Creates a connector rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RemoteConnector for LocalDirConnector {
    fn connect<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteSession>, RemoteError>> {
        Box::pin(async move {
            let meta = tokio::fs::metadata(&self.root).await.map_err(|e| {
                RemoteError::Connect(format!("store root {}: {e}", self.root.display()))
            })?;
            if !meta.is_dir() {
                return Err(RemoteError::Connect(format!(
                    "store root is not a directory: {}",
                    self.root.display()
                )));
            }

            debug!(
                %endpoint,
                user = credentials.username(),
                root = %self.root.display(),
                "local store session opened"
            );
            Ok(Box::new(LocalDirSession {
                root: self.root.clone(),
            }) as Box<dyn RemoteSession>)
        })
    }
}

struct LocalDirSession {
    root: PathBuf,
}

impl RemoteSession for LocalDirSession {
    fn init_client(&mut self) -> BoxFuture<'_, Result<Box<dyn RemoteClient>, RemoteError>> {
        Box::pin(async move {
            Ok(Box::new(LocalDirClient {
                root: self.root.clone(),
            }) as Box<dyn RemoteClient>)
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>> {
        Box::pin(async move {
            debug!(root = %self.root.display(), "local store session closed");
            Ok(())
        })
    }
}

struct LocalDirClient {
    root: PathBuf,
}

impl LocalDirClient {
    /// Maps `remote_path` onto the store.
    ///
    /// Only plain names and `.` are accepted, so the result always lies
    /// strictly below `root`. `..`, a leading `/` and drive prefixes are
    /// rejected rather than normalized away.
    fn resolve(&self, remote_path: &str) -> Result<PathBuf, RemoteError> {
        let mut full = self.root.clone();
        let mut depth = 0usize;

        for component in Path::new(remote_path).components() {
            match component {
                Component::Normal(name) => {
                    full.push(name);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(self.outside_root(remote_path));
                }
            }
        }

        // "" and "." name the root itself, which is not a file.
        if depth == 0 {
            return Err(self.outside_root(remote_path));
        }
        Ok(full)
    }

    fn outside_root(&self, remote_path: &str) -> RemoteError {
        RemoteError::InvalidPath {
            path: remote_path.to_string(),
            root: self.root.display().to_string(),
        }
    }
}

impl RemoteClient for LocalDirClient {
    fn stat<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RemoteStat, RemoteError>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            match tokio::fs::metadata(&full).await {
                Ok(meta) => Ok(RemoteStat { size: meta.len() }),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(RemoteError::NotFound(path.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn open_append<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteFile>, RemoteError>> {
        Box::pin(async move {
            let full = self.resolve(path)?;

            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&full)
                .await?;

            Ok(Box::new(LocalDirFile {
                file,
                path: path.to_string(),
            }) as Box<dyn RemoteFile>)
        })
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>> {
        Box::pin(async { Ok(()) })
    }
}

struct LocalDirFile {
    file: tokio::fs::File,
    path: String,
}

impl AsyncWrite for LocalDirFile {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.file).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }
}

impl RemoteFile for LocalDirFile {
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>> {
        Box::pin(async move {
            let mut this = *self;
            this.file.flush().await?;
            this.file.sync_all().await?;
            debug!(path = %this.path, "local store handle closed");
            Ok(())
        })
    }
}
