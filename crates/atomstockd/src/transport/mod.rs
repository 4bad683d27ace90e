//! Socket endpoints served by the dispatcher.
//!
//! Every endpoint is non-blocking and exposes its descriptor through
//! [`AsFd`](std::os::fd::AsFd) so the dispatcher can poll it. Unix socket
//! files are checked for a live owner before binding and removed when their
//! endpoint drops.

mod connection;
mod datagram;
mod errors;
mod listener;
mod socket_file;

use atomstock_config::TransportPair;
use tracing::info;

pub use self::connection::ConnectionStream;
pub use self::datagram::{Datagram, DatagramEndpoint, MAX_DATAGRAM_BYTES, Peer};
pub use self::errors::TransportError;
pub use self::listener::StreamListener;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// A bound stream listener and its matching datagram endpoint.
#[derive(Debug)]
pub struct BoundPair {
    /// Listener accepting `ADD` connections.
    pub listener: StreamListener,
    /// Endpoint receiving `DELIVER` datagrams.
    pub datagram: DatagramEndpoint,
}

impl BoundPair {
    /// Binds both endpoints of `pair`.
    ///
    /// If the datagram endpoint fails, the already-bound listener is dropped
    /// and its socket file removed.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError`] encountered.
    pub fn bind(pair: &TransportPair) -> Result<Self, TransportError> {
        let bound = match pair {
            TransportPair::Network {
                host,
                stream_port,
                datagram_port,
            } => Self {
                listener: StreamListener::bind_tcp(host, *stream_port)?,
                datagram: DatagramEndpoint::bind_udp(host, *datagram_port)?,
            },
            TransportPair::Local {
                stream_path,
                datagram_path,
            } => Self {
                listener: StreamListener::bind_unix(stream_path)?,
                datagram: DatagramEndpoint::bind_unix(datagram_path)?,
            },
        };
        info!(
            target: TRANSPORT_TARGET,
            listener = %bound.listener,
            datagram = %bound.datagram,
            "endpoints bound"
        );
        Ok(bound)
    }
}
