//! Supervises the daemon from bootstrap to an orderly stop.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::sync::Arc;

use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, Daemon, DaemonParts, SystemConfigLoader, bootstrap_with};
use crate::dispatch::{DispatchSettings, Dispatcher};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::lifecycle::{Lifecycle, ShutdownReason};

use super::PROCESS_TARGET;
use super::errors::LaunchError;

/// Runs the daemon in the foreground with stdin as the console and stdout as
/// the reply sink.
///
/// # Errors
///
/// Returns [`LaunchError`] if bootstrap fails, the event loop fails or the
/// store cannot be released.
pub fn run_daemon() -> Result<ShutdownReason, LaunchError> {
    let console = io::stdin()
        .as_fd()
        .try_clone_to_owned()
        .map(File::from)
        .map_err(|source| LaunchError::Console { source })?;
    let reporter = Arc::new(StructuredHealthReporter::new());
    run_daemon_with(&SystemConfigLoader, reporter, Some(console), io::stdout())
}

/// Runs the daemon with injected collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] on bootstrap, event loop or release failure.
pub fn run_daemon_with<C, W>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    console: Option<C>,
    sink: W,
) -> Result<ShutdownReason, LaunchError>
where
    C: Read + AsFd,
    W: Write,
{
    let daemon = bootstrap_with(loader, reporter)?;
    serve(daemon, console, sink)
}

/// Serves requests until a shutdown trigger, then releases every endpoint
/// and flushes the store.
///
/// Socket files the daemon created are removed before the store is closed.
///
/// # Errors
///
/// Returns [`LaunchError::Dispatch`] if the readiness wait fails and
/// [`LaunchError::Release`] if the store cannot be flushed.
pub fn serve<C, W>(daemon: Daemon, console: Option<C>, sink: W) -> Result<ShutdownReason, LaunchError>
where
    C: Read + AsFd,
    W: Write,
{
    let DaemonParts {
        config,
        store,
        endpoints,
        shutdown,
        reporter,
    } = daemon.into_parts();

    let settings = DispatchSettings {
        max_clients: config.max_clients,
        inactivity: config.inactivity_timeout(),
    };
    let mut dispatcher = Dispatcher::new(store, sink, settings, shutdown);
    for pair in endpoints {
        dispatcher.add_pair(pair);
    }
    if let Some(input) = console {
        dispatcher.attach_console(input);
    }

    let mut lifecycle = Lifecycle::new();
    info!(
        target: PROCESS_TARGET,
        max_clients = settings.max_clients,
        inactivity = ?settings.inactivity,
        "serving requests"
    );
    let reason = dispatcher.run()?;

    lifecycle.begin_shutdown(reason, reporter.as_ref());
    let (released_store, mut released_sink) = dispatcher.into_parts();
    if let Err(error) = released_sink.flush() {
        warn!(target: PROCESS_TARGET, %error, "failed to flush console sink");
    }
    released_store.close()?;
    lifecycle.complete(reporter.as_ref());
    Ok(reason)
}
