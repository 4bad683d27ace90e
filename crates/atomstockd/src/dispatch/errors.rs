//! Error types for the event loop.

use nix::errno::Errno;
use thiserror::Error;

/// Errors that stop the event loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The readiness wait failed for a reason other than a signal.
    #[error("readiness wait failed: {source}")]
    Wait {
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
}
