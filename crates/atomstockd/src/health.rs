//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use atomstock_config::Config;

use crate::bootstrap::BootstrapError;
use crate::lifecycle::ShutdownReason;
use crate::persistence::OpenOutcome;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once the inventory store is open.
    fn store_opened(&self, path: Option<&str>, outcome: Option<OpenOutcome>);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when the daemon leaves the running state.
    fn shutdown_started(&self, reason: ShutdownReason);

    /// Invoked after every endpoint and the store are released.
    fn shutdown_completed(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn store_opened(&self, path: Option<&str>, outcome: Option<OpenOutcome>) {
        (**self).store_opened(path, outcome);
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn shutdown_started(&self, reason: ShutdownReason) {
        (**self).shutdown_started(reason);
    }

    fn shutdown_completed(&self) {
        (**self).shutdown_completed();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn store_opened(&self, path: Option<&str>, outcome: Option<OpenOutcome>) {
        match (path, outcome) {
            (Some(file), Some(OpenOutcome::Loaded)) => tracing::info!(
                target: HEALTH_TARGET,
                event = "store_opened",
                path = file,
                "loaded shared inventory; seed counts ignored"
            ),
            (Some(file), _) => tracing::info!(
                target: HEALTH_TARGET,
                event = "store_opened",
                path = file,
                "initialised shared inventory from seed counts"
            ),
            (None, _) => tracing::info!(
                target: HEALTH_TARGET,
                event = "store_opened",
                "inventory held in process memory"
            ),
        }
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            transports = config.transports().len(),
            max_clients = config.max_clients,
            timeout_secs = config.timeout_secs,
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn shutdown_started(&self, reason: ShutdownReason) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_started",
            reason = %reason,
            "daemon shutting down"
        );
    }

    fn shutdown_completed(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_completed",
            "daemon stopped"
        );
    }
}
