//! Test suites for the atomstock daemon.

mod behaviour;
pub(crate) mod support;
