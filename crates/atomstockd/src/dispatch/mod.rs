//! Single-threaded readiness loop over every endpoint and the console.
//!
//! All sources sit in one `poll(2)` set. Each iteration waits once, then
//! services every ready source in the order `poll` reports them:
//!
//! * a listener accepts one connection, refusing it past the client limit;
//! * a datagram endpoint reads one `DELIVER` request and replies to its
//!   sender;
//! * the console reads input and answers `GEN` queries, or starts shutdown
//!   on `exit`/`quit`;
//! * a connection reads one chunk of `ADD` requests and replies on the same
//!   stream, or is dropped on end of stream.
//!
//! Closed sources are swept once the iteration finishes. The inactivity
//! deadline bounds the wait; a termination signal interrupts it.

mod console;
mod errors;
mod source;

use std::io::{Read, Write};
use std::os::fd::AsFd;
use std::time::Instant;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, poll};
use tracing::{debug, info, warn};

pub use self::errors::DispatchError;
use self::console::ConsoleInput;
use self::source::{Connection, Source};
use crate::lifecycle::{InactivityDeadline, ShutdownFlag, ShutdownReason};
use crate::persistence::StockStore;
use crate::protocol::{CommandProcessor, ConsoleOutcome, Reply, TOO_MANY_CLIENTS};
use crate::transport::{BoundPair, ConnectionStream};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Loop limits.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Connections allowed across all stream listeners.
    pub max_clients: usize,
    /// Inactivity window; `None` disables the deadline.
    pub inactivity: Option<std::time::Duration>,
}

enum Serviced {
    Idle,
    Accepted(ConnectionStream),
    Stop(ShutdownReason),
}

/// Owns the store, the poll set and the console sink.
///
/// `C` is the console reader and `W` the sink that receives console replies
/// and stock lines.
#[derive(Debug)]
pub struct Dispatcher<C, W> {
    sources: Vec<Source<C>>,
    store: StockStore,
    console_sink: W,
    max_clients: usize,
    deadline: InactivityDeadline,
    shutdown: ShutdownFlag,
}

impl<C, W> Dispatcher<C, W>
where
    C: Read + AsFd,
    W: Write,
{
    /// Builds a dispatcher with an empty poll set.
    pub const fn new(
        store: StockStore,
        console_sink: W,
        settings: DispatchSettings,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            sources: Vec::new(),
            store,
            console_sink,
            max_clients: settings.max_clients,
            deadline: InactivityDeadline::new(settings.inactivity),
            shutdown,
        }
    }

    /// Adds a bound listener/datagram pair to the poll set.
    pub fn add_pair(&mut self, pair: BoundPair) {
        self.sources.push(Source::Listener(pair.listener));
        self.sources.push(Source::Datagram(pair.datagram));
    }

    /// Adds the console reader to the poll set.
    pub fn attach_console(&mut self, reader: C) {
        self.sources.push(Source::Console(ConsoleInput::new(reader)));
    }

    /// Number of connected stream clients.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|source| matches!(source, Source::Connection(_)))
            .count()
    }

    /// Serves until a shutdown trigger fires and returns its reason.
    ///
    /// The current stock line is printed before the first wait.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Wait`] if `poll` fails other than by
    /// interruption.
    pub fn run(&mut self) -> Result<ShutdownReason, DispatchError> {
        CommandProcessor::new(&mut self.store, &mut self.console_sink).report_stock();
        self.flush_console();

        loop {
            if self.shutdown.is_raised() {
                return Ok(ShutdownReason::Signal);
            }
            let now = Instant::now();
            self.deadline.arm(now);
            if self.deadline.expired(now) {
                return Ok(ShutdownReason::Inactivity);
            }

            let ready = self.wait(now)?;
            if ready.is_empty() {
                continue;
            }
            self.deadline.disarm();

            for index in ready {
                match self.service(index) {
                    Serviced::Idle => {}
                    Serviced::Accepted(stream) => self.admit(stream),
                    Serviced::Stop(reason) => return Ok(reason),
                }
            }
            self.sources.retain(Source::is_active);
        }
    }

    /// Releases every endpoint, removing socket files, and hands back the
    /// store and sink.
    #[must_use]
    pub fn into_parts(self) -> (StockStore, W) {
        let Self {
            sources,
            store,
            console_sink,
            ..
        } = self;
        drop(sources);
        (store, console_sink)
    }

    /// Waits for readiness and returns the ready source indices. Empty on
    /// timeout or interruption.
    fn wait(&self, now: Instant) -> Result<Vec<usize>, DispatchError> {
        let timeout = self.deadline.poll_timeout(now);
        let mut fds: Vec<PollFd<'_>> = self
            .sources
            .iter()
            .map(|source| PollFd::new(source.as_fd(), PollFlags::POLLIN))
            .collect();
        match poll(&mut fds, timeout) {
            Ok(0) => Ok(Vec::new()),
            Ok(_) => {
                let readable = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
                Ok(fds
                    .iter()
                    .enumerate()
                    .filter(|(_, fd)| fd.revents().is_some_and(|events| events.intersects(readable)))
                    .map(|(index, _)| index)
                    .collect())
            }
            Err(Errno::EINTR) => {
                debug!(target: DISPATCH_TARGET, "readiness wait interrupted");
                Ok(Vec::new())
            }
            Err(source) => Err(DispatchError::Wait { source }),
        }
    }

    fn service(&mut self, index: usize) -> Serviced {
        let Self {
            sources,
            store,
            console_sink,
            ..
        } = self;
        let Some(source) = sources.get_mut(index) else {
            return Serviced::Idle;
        };
        let mut processor = CommandProcessor::new(store, console_sink);

        let serviced = match source {
            Source::Listener(listener) => match listener.accept() {
                Ok(Some(stream)) => Serviced::Accepted(stream),
                Ok(None) => Serviced::Idle,
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, listener = %listener, %error, "accept failed");
                    Serviced::Idle
                }
            },
            Source::Datagram(endpoint) => {
                match endpoint.receive() {
                    Ok(Some(datagram)) => {
                        let reply = processor.handle_deliver(&datagram.payload);
                        match endpoint.reply(&datagram.peer, &reply.to_line()) {
                            Ok(true) => {}
                            Ok(false) => warn!(
                                target: DISPATCH_TARGET,
                                peer = %datagram.peer,
                                "sender has no address; reply dropped"
                            ),
                            Err(error) => warn!(
                                target: DISPATCH_TARGET,
                                peer = %datagram.peer,
                                %error,
                                "failed to send datagram reply"
                            ),
                        }
                    }
                    Ok(None) => {}
                    Err(error) => {
                        warn!(target: DISPATCH_TARGET, endpoint = %endpoint, %error, "receive failed");
                    }
                }
                Serviced::Idle
            }
            Source::Console(console) => service_console(console, &mut processor),
            Source::Connection(connection) => {
                if let Some(payload) = connection.read_chunk() {
                    for reply in processor.handle_stream_payload(&payload) {
                        connection.send(&reply.to_line());
                    }
                } else if !connection.is_open() {
                    info!(target: DISPATCH_TARGET, peer = %connection.label(), "client disconnected");
                }
                Serviced::Idle
            }
        };
        self.flush_console();
        serviced
    }

    fn admit(&mut self, stream: ConnectionStream) {
        let connection = Connection::new(stream);
        let connected = self.connection_count();
        if connected >= self.max_clients {
            warn!(
                target: DISPATCH_TARGET,
                peer = %connection.label(),
                limit = self.max_clients,
                "connection refused: client limit reached"
            );
            connection.refuse(&Reply::from(TOO_MANY_CLIENTS).to_line());
            return;
        }
        info!(
            target: DISPATCH_TARGET,
            peer = %connection.label(),
            total = connected + 1,
            "client connected"
        );
        self.sources.push(Source::Connection(connection));
    }

    fn flush_console(&mut self) {
        if let Err(error) = self.console_sink.flush() {
            warn!(target: DISPATCH_TARGET, %error, "failed to flush console");
        }
    }
}

fn service_console<C, W>(
    console: &mut ConsoleInput<C>,
    processor: &mut CommandProcessor<'_, W>,
) -> Serviced
where
    C: Read + AsFd,
    W: Write,
{
    let read = match console.read_lines() {
        Ok(read) => read,
        Err(error) => {
            warn!(target: DISPATCH_TARGET, %error, "console read failed; console detached");
            return Serviced::Idle;
        }
    };
    for line in &read.lines {
        match processor.handle_console_line(line) {
            ConsoleOutcome::Quit => return Serviced::Stop(ShutdownReason::ConsoleQuit),
            ConsoleOutcome::Reply(reply) => processor.print(&reply),
        }
    }
    if read.closed {
        info!(target: DISPATCH_TARGET, "console closed; serving sockets only");
    }
    Serviced::Idle
}
