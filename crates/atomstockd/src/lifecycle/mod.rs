//! Run states, shutdown triggers and the inactivity deadline.
//!
//! The daemon leaves [`LifecycleState::Running`] for one of three reasons:
//! `exit`/`quit` on the console, a whole inactivity window without
//! readiness, or a termination signal. The dispatcher observes all three;
//! the launch sequence records the transition and drives teardown.

mod deadline;
mod signals;
mod state;

pub use self::deadline::InactivityDeadline;
pub use self::signals::{ShutdownError, ShutdownFlag};
pub use self::state::{Lifecycle, LifecycleState, ShutdownReason};

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");
