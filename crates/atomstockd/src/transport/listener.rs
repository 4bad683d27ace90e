//! Stream listeners accepting `ADD` clients.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixListener;

use camino::Utf8Path;

use super::socket_file::{SocketFile, SocketKind, claim_path};
use super::{ConnectionStream, TransportError};

/// Non-blocking TCP or Unix stream listener.
#[derive(Debug)]
pub struct StreamListener {
    listener: ListenerKind,
    // Declared after the socket so the file outlives the descriptor.
    socket_file: Option<SocketFile>,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl StreamListener {
    /// Binds a TCP listener on `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the host does not resolve or the bind
    /// fails.
    pub fn bind_tcp(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = resolve(host, port)?;
        let listener =
            TcpListener::bind(addr).map_err(|source| TransportError::BindTcp { addr, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| TransportError::NonBlocking {
                endpoint: format!("tcp://{addr}"),
                source,
            })?;
        Ok(Self {
            listener: ListenerKind::Tcp(listener),
            socket_file: None,
        })
    }

    /// Binds a Unix stream listener at `path`, clearing a stale socket file.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the path is held by a live socket, is
    /// not a socket, or cannot be bound.
    pub fn bind_unix(path: &Utf8Path) -> Result<Self, TransportError> {
        claim_path(path, SocketKind::Stream)?;
        let listener = UnixListener::bind(path).map_err(|source| TransportError::BindUnix {
            path: path.to_owned(),
            source,
        })?;
        let socket_file = SocketFile::new(path);
        listener
            .set_nonblocking(true)
            .map_err(|source| TransportError::NonBlocking {
                endpoint: format!("unix://{path}"),
                source,
            })?;
        Ok(Self {
            listener: ListenerKind::Unix(listener),
            socket_file: Some(socket_file),
        })
    }

    /// Accepts one pending connection.
    ///
    /// Returns `Ok(None)` when nothing is pending. Accepted connections are
    /// switched to non-blocking mode.
    ///
    /// # Errors
    ///
    /// Returns the underlying accept error.
    pub fn accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match &self.listener {
            ListenerKind::Tcp(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Tcp(stream)),
            ListenerKind::Unix(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Unix(stream)),
        };
        match accepted {
            Ok(stream) => {
                stream.set_nonblocking(true)?;
                Ok(Some(stream))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Bound TCP address, or `None` for Unix listeners.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            ListenerKind::Unix(_) => None,
        }
    }
}

impl AsFd for StreamListener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.as_fd(),
            ListenerKind::Unix(listener) => listener.as_fd(),
        }
    }
}

impl fmt::Display for StreamListener {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.listener, &self.socket_file) {
            (ListenerKind::Tcp(listener), _) => {
                let addr = listener
                    .local_addr()
                    .map_or_else(|_| "unknown".to_owned(), |bound| bound.to_string());
                write!(formatter, "tcp://{addr}")
            }
            (ListenerKind::Unix(_), Some(file)) => write!(formatter, "unix://{}", file.path()),
            (ListenerKind::Unix(_), None) => formatter.write_str("unix://unknown"),
        }
    }
}

pub(super) fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    addrs.next().ok_or_else(|| TransportError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })
}
