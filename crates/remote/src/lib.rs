//! Remote file-access capability consumed by the upload engine.
//!
//! The engine never talks to a transport directly. It goes through four
//! object-safe traits that mirror the shape of an SFTP stack:
//!
//! 1. [`RemoteConnector`] establishes an authenticated [`RemoteSession`]
//! 2. [`RemoteSession`] starts a file-protocol [`RemoteClient`]
//! 3. [`RemoteClient`] stats paths and opens them for appending
//! 4. [`RemoteFile`] is an [`AsyncWrite`] sink with an explicit `close`
//!
//! Every acquired object has an async `close` because releasing a remote
//! handle is itself a round trip. Callers close in reverse acquisition order.
//!
//! [`LocalDirConnector`] is a directory-backed implementation used for
//! loopback deployments and tests.

pub mod error;
pub mod local;
pub mod types;

pub use error::RemoteError;
pub use local::LocalDirConnector;
pub use types::{Credentials, Endpoint, RemoteStat};

use std::future::Future;
use std::pin::Pin;

use tokio::io::AsyncWrite;

/// Boxed, sendable future returned by the capability traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opens sessions to a remote host.
///
/// Implementations own whatever handshake the transport needs (TCP dial,
/// key exchange, host-key checks, authentication).
pub trait RemoteConnector: Send + Sync {
    /// Establishes a new session. Each call returns an independent session.
    fn connect<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteSession>, RemoteError>>;
}

/// An established, authenticated session.
pub trait RemoteSession: Send {
    /// Starts a remote file-protocol client on this session.
    fn init_client(&mut self) -> BoxFuture<'_, Result<Box<dyn RemoteClient>, RemoteError>>;

    /// Tears the session down.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>>;
}

/// A remote file-protocol client bound to one session.
pub trait RemoteClient: Send + Sync {
    /// Returns the attributes of `path`.
    ///
    /// A missing path must be reported as an error for which
    /// [`RemoteError::is_not_found`] returns `true`.
    fn stat<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<RemoteStat, RemoteError>>;

    /// Opens `path` for writing in append mode, creating it if absent.
    ///
    /// Must never truncate: every write lands at the current end of file.
    fn open_append<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Box<dyn RemoteFile>, RemoteError>>;

    /// Shuts the client down.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>>;
}

/// A remote file opened for appending.
pub trait RemoteFile: AsyncWrite + Send + Unpin {
    /// Flushes buffered bytes and releases the remote handle.
    ///
    /// A failure here means the tail of the stream may not be durable.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), RemoteError>>;
}
