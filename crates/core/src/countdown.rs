//! Run-scoped countdown.
//!
//! The countdown belongs to the run, not to whichever screen is showing it.
//! Re-creating it from the run's start time yields the same remaining budget,
//! so moving between questions or reloading never resets the clock.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// Total time allowed for one run.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Running { remaining_secs: u32 },
    Expired,
}

/// Result of advancing the countdown by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running(u32),
    /// Returned exactly once, on the tick that crosses zero.
    Expired,
    /// The countdown had already expired; nothing changed.
    Stopped,
}

impl Countdown {
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self::Running {
            remaining_secs: u32::try_from(budget.as_secs()).unwrap_or(u32::MAX),
        }
    }

    /// Rebuild the countdown for a run that started at `started_at`.
    ///
    /// A run whose budget is already spent resumes at zero and expires on its
    /// next tick. A start time in the future is treated as "just started".
    #[must_use]
    pub fn resume(budget: Duration, started_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let elapsed = (now - started_at).num_seconds().max(0);
        let elapsed = u64::try_from(elapsed).unwrap_or(0);
        let remaining = budget.as_secs().saturating_sub(elapsed);
        Self::Running {
            remaining_secs: u32::try_from(remaining).unwrap_or(u32::MAX),
        }
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TickOutcome {
        match *self {
            Countdown::Running { remaining_secs } if remaining_secs <= 1 => {
                *self = Countdown::Expired;
                TickOutcome::Expired
            }
            Countdown::Running { remaining_secs } => {
                let left = remaining_secs - 1;
                *self = Countdown::Running {
                    remaining_secs: left,
                };
                TickOutcome::Running(left)
            }
            Countdown::Expired => TickOutcome::Stopped,
        }
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        match self {
            Countdown::Running { remaining_secs } => *remaining_secs,
            Countdown::Expired => 0,
        }
    }

    /// Still running but with no time left; the next tick expires it.
    #[must_use]
    pub fn is_due(&self) -> bool {
        matches!(self, Countdown::Running { remaining_secs: 0 })
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Countdown::Expired)
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.remaining_secs();
        write!(f, "{}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn ticks_down_then_expires_once() {
        let mut c = Countdown::new(Duration::from_secs(3));
        assert_eq!(c.tick(), TickOutcome::Running(2));
        assert_eq!(c.tick(), TickOutcome::Running(1));
        assert_eq!(c.tick(), TickOutcome::Expired);
        assert_eq!(c.tick(), TickOutcome::Stopped);
        assert_eq!(c.tick(), TickOutcome::Stopped);
        assert!(c.is_expired());
    }

    #[test]
    fn resume_conserves_budget() {
        let start = fixed_now();
        let now = start + chrono::Duration::seconds(125);
        let c = Countdown::resume(DEFAULT_TIME_LIMIT, start, now);
        assert_eq!(c.remaining_secs(), 30 * 60 - 125);
        assert_eq!(c.to_string(), "27:55");
    }

    #[test]
    fn resume_after_budget_is_due() {
        let start = fixed_now();
        let now = start + chrono::Duration::hours(2);
        let mut c = Countdown::resume(DEFAULT_TIME_LIMIT, start, now);
        assert!(c.is_due());
        assert_eq!(c.tick(), TickOutcome::Expired);
    }

    #[test]
    fn future_start_resumes_with_full_budget() {
        let start = fixed_now();
        let c = Countdown::resume(Duration::from_secs(60), start, start - chrono::Duration::hours(1));
        assert_eq!(c.remaining_secs(), 60);
    }

    #[test]
    fn display_pads_seconds() {
        let c = Countdown::new(Duration::from_secs(65));
        assert_eq!(c.to_string(), "1:05");
        assert_eq!(Countdown::Expired.to_string(), "0:00");
    }
}
