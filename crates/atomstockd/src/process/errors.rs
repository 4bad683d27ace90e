//! Defines the unified error surface for daemon launch and supervision.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::dispatch::DispatchError;
use crate::persistence::PersistenceError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the daemon failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The console input could not be duplicated for polling.
    #[error("failed to attach console input: {source}")]
    Console {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The event loop stopped on an unrecoverable wait failure.
    #[error("event loop failed: {source}")]
    Dispatch {
        /// Underlying dispatch error.
        #[source]
        source: DispatchError,
    },
    /// Flushing the shared inventory during shutdown failed.
    #[error("failed to release inventory store: {source}")]
    Release {
        /// Underlying store error.
        #[source]
        source: PersistenceError,
    },
}

impl LaunchError {
    /// Whether telemetry was running when the error occurred.
    ///
    /// Configuration and telemetry failures happen before any subscriber is
    /// installed, so their diagnostics must go straight to stderr.
    #[must_use]
    pub const fn telemetry_ready(&self) -> bool {
        !matches!(
            self,
            Self::Bootstrap {
                source: BootstrapError::Configuration { .. } | BootstrapError::Telemetry { .. }
            }
        )
    }
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<DispatchError> for LaunchError {
    fn from(source: DispatchError) -> Self {
        Self::Dispatch { source }
    }
}

impl From<PersistenceError> for LaunchError {
    fn from(source: PersistenceError) -> Self {
        Self::Release { source }
    }
}
