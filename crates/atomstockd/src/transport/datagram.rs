//! Datagram endpoints receiving `DELIVER` requests.

use std::fmt;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;

use camino::Utf8Path;

use super::listener::resolve;
use super::socket_file::{SocketFile, SocketKind, claim_path};
use super::TransportError;

/// Largest request read from one datagram.
pub const MAX_DATAGRAM_BYTES: usize = 1024;

/// Sender of a received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    /// UDP sender address.
    Udp(SocketAddr),
    /// Unix datagram sender; `None` when the sender is unbound.
    Unix(Option<PathBuf>),
}

impl fmt::Display for Peer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp(addr) => write!(formatter, "udp:{addr}"),
            Self::Unix(Some(path)) => write!(formatter, "unixgram:{}", path.display()),
            Self::Unix(None) => formatter.write_str("unixgram:unnamed"),
        }
    }
}

/// One received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Payload decoded as UTF-8, with invalid sequences replaced.
    pub payload: String,
    /// Where the reply goes.
    pub peer: Peer,
}

/// Non-blocking UDP or Unix datagram socket.
#[derive(Debug)]
pub struct DatagramEndpoint {
    socket: DatagramKind,
    // Declared after the socket so the file outlives the descriptor.
    socket_file: Option<SocketFile>,
}

#[derive(Debug)]
enum DatagramKind {
    Udp(UdpSocket),
    Unix(UnixDatagram),
}

impl DatagramEndpoint {
    /// Binds a UDP endpoint on `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the host does not resolve or the bind
    /// fails.
    pub fn bind_udp(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = resolve(host, port)?;
        let socket =
            UdpSocket::bind(addr).map_err(|source| TransportError::BindUdp { addr, source })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::NonBlocking {
                endpoint: format!("udp://{addr}"),
                source,
            })?;
        Ok(Self {
            socket: DatagramKind::Udp(socket),
            socket_file: None,
        })
    }

    /// Binds a Unix datagram endpoint at `path`, clearing a stale socket
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the path is held by a live socket, is
    /// not a socket, or cannot be bound.
    pub fn bind_unix(path: &Utf8Path) -> Result<Self, TransportError> {
        claim_path(path, SocketKind::Datagram)?;
        let socket = UnixDatagram::bind(path).map_err(|source| TransportError::BindUnix {
            path: path.to_owned(),
            source,
        })?;
        let socket_file = SocketFile::new(path);
        socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::NonBlocking {
                endpoint: format!("unixgram://{path}"),
                source,
            })?;
        Ok(Self {
            socket: DatagramKind::Unix(socket),
            socket_file: Some(socket_file),
        })
    }

    /// Receives one datagram, or `Ok(None)` when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns the underlying receive error.
    pub fn receive(&self) -> io::Result<Option<Datagram>> {
        let mut buffer = [0_u8; MAX_DATAGRAM_BYTES];
        let received = match &self.socket {
            DatagramKind::Udp(socket) => socket
                .recv_from(&mut buffer)
                .map(|(len, addr)| (len, Peer::Udp(addr))),
            DatagramKind::Unix(socket) => socket.recv_from(&mut buffer).map(|(len, addr)| {
                (len, Peer::Unix(addr.as_pathname().map(ToOwned::to_owned)))
            }),
        };
        match received {
            Ok((len, peer)) => {
                let bytes = buffer.get(..len).unwrap_or_default();
                Ok(Some(Datagram {
                    payload: String::from_utf8_lossy(bytes).into_owned(),
                    peer,
                }))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Sends `bytes` back to `peer`.
    ///
    /// Returns `Ok(false)` when the peer cannot be addressed (an unbound
    /// Unix sender) and nothing was sent.
    ///
    /// # Errors
    ///
    /// Returns the underlying send error.
    pub fn reply(&self, peer: &Peer, bytes: &[u8]) -> io::Result<bool> {
        match (&self.socket, peer) {
            (DatagramKind::Udp(socket), Peer::Udp(addr)) => socket.send_to(bytes, addr).map(|_| true),
            (DatagramKind::Unix(socket), Peer::Unix(Some(path))) => {
                socket.send_to(bytes, path).map(|_| true)
            }
            (DatagramKind::Unix(_), Peer::Unix(None)) => Ok(false),
            (_, mismatched) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("peer {mismatched} does not match the endpoint family"),
            )),
        }
    }

    /// Bound UDP address, or `None` for Unix endpoints.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.socket {
            DatagramKind::Udp(socket) => socket.local_addr().ok(),
            DatagramKind::Unix(_) => None,
        }
    }
}

impl AsFd for DatagramEndpoint {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.socket {
            DatagramKind::Udp(socket) => socket.as_fd(),
            DatagramKind::Unix(socket) => socket.as_fd(),
        }
    }
}

impl fmt::Display for DatagramEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.socket, &self.socket_file) {
            (DatagramKind::Udp(socket), _) => {
                let addr = socket
                    .local_addr()
                    .map_or_else(|_| "unknown".to_owned(), |bound| bound.to_string());
                write!(formatter, "udp://{addr}")
            }
            (DatagramKind::Unix(_), Some(file)) => {
                write!(formatter, "unixgram://{}", file.path())
            }
            (DatagramKind::Unix(_), None) => formatter.write_str("unixgram://unknown"),
        }
    }
}
