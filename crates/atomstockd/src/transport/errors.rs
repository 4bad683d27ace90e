//! Error types for binding transport endpoints.

use std::io;
use std::net::SocketAddr;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors surfaced while binding stream listeners or datagram endpoints.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Resolving the bind host failed.
    #[error("failed to resolve address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bind host resolved to nothing.
    #[error("no addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Binding the TCP listener failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Resolved address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Binding the UDP endpoint failed.
    #[error("failed to bind UDP endpoint at {addr}: {source}")]
    BindUdp {
        /// Resolved address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Switching a socket to non-blocking mode failed.
    #[error("failed to enable non-blocking mode on {endpoint}: {source}")]
    NonBlocking {
        /// Endpoint description.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Binding a Unix socket failed.
    #[error("failed to bind unix socket at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another process is serving the socket path.
    #[error("existing unix socket {path} is already in use")]
    UnixInUse {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// The socket path exists but is not a socket.
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket {
        /// Socket path.
        path: Utf8PathBuf,
    },
    /// Reading metadata for an existing socket path failed.
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Probing an existing socket failed unexpectedly.
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale socket file failed.
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
