//! Everything the dispatcher polls.

use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd};

use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::console::ConsoleInput;
use crate::transport::{ConnectionStream, DatagramEndpoint, StreamListener};

/// Size of one stream read.
pub(crate) const STREAM_CHUNK_BYTES: usize = 1024;

/// One poll-set member.
#[derive(Debug)]
pub(crate) enum Source<C> {
    Listener(StreamListener),
    Datagram(DatagramEndpoint),
    Console(ConsoleInput<C>),
    Connection(Connection),
}

impl<C: Read + AsFd> Source<C> {
    /// Whether the source should stay in the poll set.
    pub(crate) const fn is_active(&self) -> bool {
        match self {
            Self::Listener(_) | Self::Datagram(_) => true,
            Self::Console(console) => console.is_open(),
            Self::Connection(connection) => connection.is_open(),
        }
    }
}

impl<C: AsFd> AsFd for Source<C> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Listener(listener) => listener.as_fd(),
            Self::Datagram(endpoint) => endpoint.as_fd(),
            Self::Console(console) => console.as_fd(),
            Self::Connection(connection) => connection.stream.as_fd(),
        }
    }
}

/// An accepted stream client and its liveness.
#[derive(Debug)]
pub(crate) struct Connection {
    stream: ConnectionStream,
    label: String,
    open: bool,
}

impl Connection {
    pub(crate) fn new(stream: ConnectionStream) -> Self {
        let label = stream.peer_label();
        Self {
            stream,
            label,
            open: true,
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.open
    }

    /// Reads one chunk; `None` when nothing was read. Marks the
    /// connection closed on end of stream or a read error.
    pub(crate) fn read_chunk(&mut self) -> Option<String> {
        let mut chunk = [0_u8; STREAM_CHUNK_BYTES];
        match self.stream.read(&mut chunk) {
            Ok(0) => {
                self.open = false;
                None
            }
            Ok(read) => chunk
                .get(..read)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
            Err(error)
                if matches!(
                    error.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
                ) =>
            {
                None
            }
            Err(error) => {
                debug!(target: DISPATCH_TARGET, peer = %self.label, %error, "stream read failed");
                self.open = false;
                None
            }
        }
    }

    /// Writes one reply line, closing the connection if the peer is gone.
    pub(crate) fn send(&mut self, line: &[u8]) {
        if let Err(error) = self.stream.write_all(line).and_then(|()| self.stream.flush()) {
            warn!(target: DISPATCH_TARGET, peer = %self.label, %error, "failed to send reply");
            self.open = false;
        }
    }

    /// Writes `line` and drops the connection.
    pub(crate) fn refuse(mut self, line: &[u8]) {
        self.send(line);
    }
}
