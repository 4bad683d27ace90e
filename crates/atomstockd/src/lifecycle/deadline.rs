//! Inactivity deadline fed to the readiness wait.

use std::time::{Duration, Instant};

use nix::poll::PollTimeout;

/// Re-armed before every wait and disarmed by any readiness.
///
/// Expiry while armed means a full window passed with no activity.
#[derive(Debug, Clone, Copy)]
pub struct InactivityDeadline {
    window: Option<Duration>,
    armed_at: Option<Instant>,
}

impl InactivityDeadline {
    /// Builds a deadline; `None` never expires.
    #[must_use]
    pub const fn new(window: Option<Duration>) -> Self {
        Self {
            window,
            armed_at: None,
        }
    }

    /// Starts a fresh window at `now`, unless already armed.
    ///
    /// A wait interrupted by a signal keeps the original start so retries do
    /// not extend the window.
    pub const fn arm(&mut self, now: Instant) {
        if self.armed_at.is_none() {
            self.armed_at = Some(now);
        }
    }

    /// Clears the window after activity.
    pub const fn disarm(&mut self) {
        self.armed_at = None;
    }

    /// Time left in the current window, `None` when disabled or disarmed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let window = self.window?;
        let armed_at = self.armed_at?;
        Some(window.saturating_sub(now.saturating_duration_since(armed_at)))
    }

    /// Whether the armed window has fully elapsed.
    #[must_use]
    pub fn expired(&self, now: Instant) -> bool {
        self.remaining(now).is_some_and(|left| left.is_zero())
    }

    /// Timeout for `poll`: the remaining window, or forever.
    #[must_use]
    pub fn poll_timeout(&self, now: Instant) -> PollTimeout {
        self.remaining(now).map_or(PollTimeout::NONE, |left| {
            // Round up so a sub-millisecond remainder does not spin.
            let millis = left.as_micros().div_ceil(1000);
            u32::try_from(millis)
                .ok()
                .and_then(|bounded| PollTimeout::try_from(bounded).ok())
                .unwrap_or(PollTimeout::MAX)
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn disabled_deadline_waits_forever() {
        let mut deadline = InactivityDeadline::new(None);
        let now = Instant::now();
        deadline.arm(now);
        assert_eq!(deadline.poll_timeout(now), PollTimeout::NONE);
        assert!(!deadline.expired(now + Duration::from_secs(3600)));
    }

    #[rstest]
    fn armed_deadline_counts_down() {
        let mut deadline = InactivityDeadline::new(Some(Duration::from_secs(5)));
        let start = Instant::now();
        deadline.arm(start);
        assert_eq!(
            deadline.remaining(start + Duration::from_secs(2)),
            Some(Duration::from_secs(3))
        );
        assert!(deadline.expired(start + Duration::from_secs(5)));
    }

    #[rstest]
    fn rearming_keeps_the_original_start() {
        let mut deadline = InactivityDeadline::new(Some(Duration::from_secs(5)));
        let start = Instant::now();
        deadline.arm(start);
        deadline.arm(start + Duration::from_secs(4));
        assert!(deadline.expired(start + Duration::from_secs(5)));
    }

    #[rstest]
    fn activity_restarts_the_window() {
        let mut deadline = InactivityDeadline::new(Some(Duration::from_secs(5)));
        let start = Instant::now();
        deadline.arm(start);
        deadline.disarm();
        assert_eq!(deadline.remaining(start), None);
        deadline.arm(start + Duration::from_secs(4));
        assert!(!deadline.expired(start + Duration::from_secs(5)));
    }

    #[rstest]
    fn poll_timeout_rounds_up() {
        let mut deadline = InactivityDeadline::new(Some(Duration::from_micros(1500)));
        let start = Instant::now();
        deadline.arm(start);
        assert_eq!(
            deadline.poll_timeout(start),
            PollTimeout::try_from(2_u32).expect("valid timeout")
        );
    }
}
