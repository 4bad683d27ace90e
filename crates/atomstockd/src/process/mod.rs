//! Launch sequencing: bootstrap, serve, then tear down in order.

mod errors;
mod launch;

pub use errors::LaunchError;
pub use launch::{run_daemon, run_daemon_with, serve};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
