//! Throughput floor for a running transfer.
//!
//! Every `interval` the monitor compares the bytes written since the previous
//! check against `min_bytes_per_interval`. The first check happens one full
//! interval after start and is measured from zero, so a source that has not
//! produced anything by then counts as stalled.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::CopyError;

/// Default wall-clock time between checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
/// Default minimum bytes per interval (40 bytes/second at the default interval).
pub const DEFAULT_MIN_BYTES_PER_INTERVAL: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallPolicy {
    pub interval: Duration,
    pub min_bytes_per_interval: u64,
}

impl Default for StallPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            min_bytes_per_interval: DEFAULT_MIN_BYTES_PER_INTERVAL,
        }
    }
}

/// Recurring liveness check. Owns its timer; dropping the monitor stops it.
#[derive(Debug)]
pub struct StallMonitor {
    ticker: Interval,
    policy: StallPolicy,
    last_observed: u64,
}

impl StallMonitor {
    pub fn new(policy: StallPolicy) -> Self {
        // tokio panics on a zero period.
        let period = policy.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker,
            policy,
            last_observed: 0,
        }
    }

    /// Wait for the next check. Cancel-safe, so it can sit in a `select!` loop.
    pub async fn tick(&mut self) {
        self.ticker.tick().await;
    }

    /// Judge the interval that just ended given the current byte total.
    pub fn check(&mut self, current: u64) -> Result<(), CopyError> {
        let received = current.saturating_sub(self.last_observed);
        if received < self.policy.min_bytes_per_interval {
            return Err(CopyError::Stalled {
                received,
                interval: self.policy.interval,
            });
        }
        self.last_observed = current;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::CopyErrorKind;

    fn policy(min: u64) -> StallPolicy {
        StallPolicy {
            interval: Duration::from_secs(5),
            min_bytes_per_interval: min,
        }
    }

    #[tokio::test]
    async fn first_interval_is_measured_from_zero() {
        let mut m = StallMonitor::new(policy(200));
        let err = m.check(0).unwrap_err();
        assert_eq!(err.kind(), CopyErrorKind::Stalled);
        let mut m = StallMonitor::new(policy(200));
        assert!(m.check(199).is_err());
    }

    #[tokio::test]
    async fn exactly_the_floor_passes() {
        let mut m = StallMonitor::new(policy(200));
        assert!(m.check(200).is_ok());
        assert!(m.check(400).is_ok());
        assert!(m.check(599).is_err());
    }

    #[tokio::test]
    async fn progress_is_measured_per_interval_not_cumulatively() {
        let mut m = StallMonitor::new(policy(200));
        assert!(m.check(1_000_000).is_ok());
        match m.check(1_000_050) {
            Err(CopyError::Stalled { received, interval }) => {
                assert_eq!(received, 50);
                assert_eq!(interval, Duration::from_secs(5));
            }
            other => panic!("expected stall, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_interval() {
        let start = Instant::now();
        let mut m = StallMonitor::new(policy(200));
        m.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        m.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }
}
