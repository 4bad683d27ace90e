//! Text command handling for stock additions, molecule deliveries and drink
//! capacity queries.
//!
//! Each request is validated syntactically, resolved against the recipe
//! tables, applied to the [`StockStore`] and answered with exactly one
//! [`Reply`]. The lone exception is a malformed `ADD`, which is logged and
//! dropped without a reply. Successful mutations also write a
//! `Stock: C=<c>, H=<h>, O=<o>` line to the console sink.

mod reply;
mod request;

use std::io::Write;

use tracing::{debug, error, warn};

pub use self::reply::Reply;
pub(crate) use self::reply::TOO_MANY_CLIENTS;
use self::reply::{ADD_ACCEPTED, ADD_REJECTED, DELIVER_ACCEPTED, DELIVER_REJECTED};
use self::request::{AddRequest, DeliverRequest, GenRequest, RequestError};
use crate::inventory::{Drink, Element, Molecule};
use crate::persistence::{PersistenceError, StockStore};

pub(crate) const PROTOCOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::protocol");

/// What the console asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOutcome {
    /// `exit` or `quit` was entered.
    Quit,
    /// Reply to print on the console sink.
    Reply(Reply),
}

/// Applies requests to a store and reports stock changes to a console sink.
pub struct CommandProcessor<'a, W> {
    store: &'a mut StockStore,
    console: &'a mut W,
}

impl<'a, W: Write> CommandProcessor<'a, W> {
    /// Binds a processor to the store and console sink for one event.
    pub const fn new(store: &'a mut StockStore, console: &'a mut W) -> Self {
        Self { store, console }
    }

    /// Handles one stream payload, which may hold several newline-separated
    /// `ADD` requests. Returns the replies in request order.
    pub fn handle_stream_payload(&mut self, payload: &str) -> Vec<Reply> {
        payload
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| self.handle_add(line))
            .collect()
    }

    /// Handles one `ADD <ELEMENT> <AMOUNT>` line.
    ///
    /// Returns `None` for malformed requests, which receive no reply.
    pub fn handle_add(&mut self, line: &str) -> Option<Reply> {
        let request = match AddRequest::parse(line) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: PROTOCOL_TARGET, line, %error, "dropping stream request");
                return error.reply().map(Reply::from);
            }
        };

        let element = match request.element.parse::<Element>() {
            Ok(element) => element,
            Err(error) => {
                debug!(target: PROTOCOL_TARGET, %error, "rejecting addition");
                return Some(ADD_REJECTED.into());
            }
        };

        let amount = u64::from(request.amount);
        match self.store.write(|inventory| inventory.add_units(element, amount)) {
            Ok(Ok(total)) => {
                debug!(target: PROTOCOL_TARGET, %element, amount, total, "units added");
                self.report_stock();
                Some(ADD_ACCEPTED.into())
            }
            Ok(Err(error)) => {
                debug!(target: PROTOCOL_TARGET, %error, "rejecting addition");
                Some(ADD_REJECTED.into())
            }
            Err(error) => {
                log_store_failure(&error);
                Some(ADD_REJECTED.into())
            }
        }
    }

    /// Handles one `DELIVER <MOLECULE> <AMOUNT>` datagram.
    pub fn handle_deliver(&mut self, payload: &str) -> Reply {
        let request = match DeliverRequest::parse(payload) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: PROTOCOL_TARGET, payload, %error, "rejecting datagram");
                return reject_with(&error);
            }
        };

        let molecule = match request.molecule.parse::<Molecule>() {
            Ok(molecule) => molecule,
            Err(error) => {
                debug!(target: PROTOCOL_TARGET, %error, "rejecting delivery");
                return DELIVER_REJECTED.into();
            }
        };

        let amount = u64::from(request.amount);
        match self
            .store
            .write(|inventory| inventory.consume_for_molecule(molecule, amount))
        {
            Ok(Ok(())) => {
                debug!(target: PROTOCOL_TARGET, %molecule, amount, "molecules delivered");
                self.report_stock();
                DELIVER_ACCEPTED.into()
            }
            Ok(Err(error)) => {
                debug!(target: PROTOCOL_TARGET, %error, "rejecting delivery");
                DELIVER_REJECTED.into()
            }
            Err(error) => {
                log_store_failure(&error);
                DELIVER_REJECTED.into()
            }
        }
    }

    /// Handles one console line: `exit`/`quit` or a `GEN <DRINK>` query.
    pub fn handle_console_line(&mut self, line: &str) -> ConsoleOutcome {
        let command = line.trim();
        if command == "exit" || command == "quit" {
            return ConsoleOutcome::Quit;
        }
        ConsoleOutcome::Reply(self.handle_gen(command))
    }

    /// Handles one `GEN <DRINK>` query. Never mutates the inventory.
    pub fn handle_gen(&self, line: &str) -> Reply {
        let request = match GenRequest::parse(line) {
            Ok(request) => request,
            Err(error) => return reject_with(&error),
        };

        let Some(drink) = Drink::from_name(&request.drink) else {
            return Reply::new(format!("Error: Unknown drink type '{}'", request.drink));
        };

        let count = self
            .store
            .read(|inventory| inventory.estimate_drink_capacity(drink))
            .unwrap_or_else(|error| {
                log_store_failure(&error);
                0
            });
        Reply::new(format!("Can produce {count} {drink} drinks"))
    }

    /// Writes a console reply to the console sink.
    pub fn print(&mut self, reply: &Reply) {
        if let Err(error) = self.console.write_all(&reply.to_line()) {
            warn!(target: PROTOCOL_TARGET, %error, "failed to write console reply");
        }
    }

    /// Writes the current `Stock:` line to the console sink.
    pub fn report_stock(&mut self) {
        let snapshot = match self.store.read(|inventory| *inventory) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                log_store_failure(&error);
                return;
            }
        };
        if let Err(error) = writeln!(self.console, "Stock: {snapshot}") {
            warn!(target: PROTOCOL_TARGET, %error, "failed to write stock line");
        }
    }
}

fn reject_with(error: &RequestError) -> Reply {
    error.reply().map_or_else(
        || Reply::new(error.to_string()),
        Reply::from,
    )
}

fn log_store_failure(error: &PersistenceError) {
    error!(target: PROTOCOL_TARGET, %error, "inventory store unavailable");
}
