use std::fmt;

use resume_upload_remote::RemoteError;

/// Step-classified failure of a single upload attempt.
///
/// Each variant names the step that failed and wraps its cause.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to connect to remote host: {0}")]
    ConnectFailed(#[source] RemoteError),

    #[error("failed to create remote file client: {0}")]
    ClientInitFailed(#[source] RemoteError),

    #[error("failed to open local file: {0}")]
    LocalOpenFailed(#[source] std::io::Error),

    #[error("failed to stat remote file: {0}")]
    RemoteStatFailed(#[source] RemoteError),

    #[error("failed to seek local file: {0}")]
    LocalSeekFailed(#[source] std::io::Error),

    #[error("failed to open remote file: {0}")]
    RemoteOpenFailed(#[source] RemoteError),

    #[error("failed to upload file: {0}")]
    CopyFailed(#[source] std::io::Error),
}

/// Which step of the attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connect,
    ClientInit,
    LocalOpen,
    RemoteStat,
    LocalSeek,
    RemoteOpen,
    Copy,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::ClientInit => "client_init",
            Self::LocalOpen => "local_open",
            Self::RemoteStat => "remote_stat",
            Self::LocalSeek => "local_seek",
            Self::RemoteOpen => "remote_open",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransferError {
    /// Classifies the error by failed step.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConnectFailed(_) => FailureKind::Connect,
            Self::ClientInitFailed(_) => FailureKind::ClientInit,
            Self::LocalOpenFailed(_) => FailureKind::LocalOpen,
            Self::RemoteStatFailed(_) => FailureKind::RemoteStat,
            Self::LocalSeekFailed(_) => FailureKind::LocalSeek,
            Self::RemoteOpenFailed(_) => FailureKind::RemoteOpen,
            Self::CopyFailed(_) => FailureKind::Copy,
        }
    }
}
