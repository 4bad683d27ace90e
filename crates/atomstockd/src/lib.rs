//! Atom inventory daemon.
//!
//! The daemon keeps three element counters (carbon, hydrogen, oxygen) and
//! serves three text commands over a single-threaded readiness loop:
//!
//! * `ADD <ELEMENT> <AMOUNT>` on TCP or Unix stream connections adds units;
//! * `DELIVER <MOLECULE> <AMOUNT>` on UDP or Unix datagram sockets consumes
//!   the atoms for that many molecules, all or nothing;
//! * `GEN <DRINK>` on the console reports how many drinks the stock could
//!   make without touching it.
//!
//! With a save file configured, the counters live in a shared memory-mapped
//! record guarded by advisory file locks, so several daemons started against
//! the same file serve one inventory.
//!
//! The bootstrap sequence loads configuration, initialises structured
//! telemetry, opens the [`persistence::StockStore`], binds every endpoint
//! pair and installs termination signal handlers. Health reporting hooks
//! emit a structured event at each stage. The daemon stops on `exit` or
//! `quit` at the console, after an inactivity window with no requests, or on
//! a termination signal, and removes the socket files it created.

mod bootstrap;
pub mod dispatch;
mod health;
pub mod inventory;
pub mod lifecycle;
pub mod persistence;
mod process;
pub mod protocol;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, run_daemon, run_daemon_with, serve};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
