//! Termination signal latch checked by the dispatcher between waits.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use thiserror::Error;
use tracing::debug;

use super::LIFECYCLE_TARGET;

const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shared flag raised by a termination signal or by [`ShutdownFlag::raise`].
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    raised: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Builds a lowered flag with no signal handlers attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag on SIGTERM, SIGINT, SIGQUIT and SIGHUP.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] if a handler cannot be registered.
    pub fn install_signal_handlers(&self) -> Result<(), ShutdownError> {
        for signal in TERMINATION_SIGNALS {
            signal_hook::flag::register(signal, Arc::clone(&self.raised))
                .map_err(|source| ShutdownError::Install { source })?;
        }
        debug!(target: LIFECYCLE_TARGET, "termination signal handlers installed");
        Ok(())
    }

    /// Raises the flag from ordinary code.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
