//! Remote capability error types.

/// Errors produced by a remote file-access implementation.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("no such file: {0}")]
    NotFound(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not name a file inside the store it was resolved against.
    #[error("remote path {path:?} does not resolve inside store root {root}")]
    InvalidPath { path: String, root: String },
}

impl RemoteError {
    /// Returns `true` when the error means the remote path does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
