//! Daemon run states and the reasons for leaving them.

use std::fmt;

use crate::health::HealthReporter;

/// Coarse daemon state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Serving requests.
    Running,
    /// Releasing endpoints and the store.
    ShuttingDown,
    /// Everything released.
    Stopped,
}

/// Why the daemon stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// `exit` or `quit` on the console.
    ConsoleQuit,
    /// No readiness for a whole inactivity window.
    Inactivity,
    /// A termination signal arrived.
    Signal,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::ConsoleQuit => "console_quit",
            Self::Inactivity => "inactivity",
            Self::Signal => "signal",
        })
    }
}

/// Tracks the current [`LifecycleState`] and only moves it forward.
#[derive(Debug)]
pub struct Lifecycle {
    state: LifecycleState,
    reason: Option<ShutdownReason>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Starts in [`LifecycleState::Running`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Running,
            reason: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Reason recorded by [`Self::begin_shutdown`], if any.
    #[must_use]
    pub const fn reason(&self) -> Option<ShutdownReason> {
        self.reason
    }

    /// Moves Running to ShuttingDown and reports the reason.
    ///
    /// Later calls change nothing and report nothing; the first reason wins.
    pub fn begin_shutdown(&mut self, reason: ShutdownReason, reporter: &dyn HealthReporter) {
        if self.state != LifecycleState::Running {
            return;
        }
        self.state = LifecycleState::ShuttingDown;
        self.reason = Some(reason);
        reporter.shutdown_started(reason);
    }

    /// Moves ShuttingDown to Stopped and reports completion.
    ///
    /// Does nothing from any other state.
    pub fn complete(&mut self, reporter: &dyn HealthReporter) {
        if self.state != LifecycleState::ShuttingDown {
            return;
        }
        self.state = LifecycleState::Stopped;
        reporter.shutdown_completed();
    }
}
