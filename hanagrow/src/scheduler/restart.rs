//! Backoff between run restarts.
//!
//! Failures are counted inside a sliding window:
//!
//! - Below the threshold: restart immediately
//! - At or above it: backoff = base * 2^(failures - threshold)
//! - Backoff is capped at `max_backoff`
//! - Failures older than the window are forgotten

use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Default base backoff duration (1 second).
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Default maximum backoff duration (5 minutes).
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Default failure window (60 seconds).
pub const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(60);

/// Default failure count at which backoff starts.
pub const DEFAULT_FAILURE_THRESHOLD: usize = 3;

/// Maximum exponent to prevent overflow.
const MAX_EXPONENT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub failure_window: Duration,
    pub failure_threshold: usize,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            failure_window: DEFAULT_FAILURE_WINDOW,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}

impl RestartPolicy {
    /// Never wait between restarts.
    pub fn immediate() -> Self {
        Self {
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Formula: base * 2^(failures - threshold) for failures >= threshold
    fn backoff_for(&self, failures: usize) -> Duration {
        if failures < self.failure_threshold {
            return Duration::ZERO;
        }

        let exponent = (failures - self.failure_threshold).min(MAX_EXPONENT as usize) as u32;
        let multiplier = 2u32.saturating_pow(exponent);
        self.base_backoff
            .saturating_mul(multiplier)
            .min(self.max_backoff)
    }
}

/// Failure history of the run loop.
#[derive(Debug)]
pub struct RestartTracker {
    policy: RestartPolicy,
    failures: Vec<Instant>,
    total_restarts: u64,
}

impl RestartTracker {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            failures: Vec::new(),
            total_restarts: 0,
        }
    }

    /// Record a failed run and return how long to wait before the next one.
    pub fn record_failure(&mut self) -> Duration {
        self.record_failure_at(Instant::now())
    }

    fn record_failure_at(&mut self, now: Instant) -> Duration {
        let window = self.policy.failure_window;
        self.failures.retain(|&t| now.duration_since(t) < window);
        self.failures.push(now);
        self.total_restarts += 1;

        let failures = self.failures.len();
        let backoff = self.policy.backoff_for(failures);

        if backoff.is_zero() {
            debug!(failures, "Run failed, restarting immediately");
        } else {
            info!(failures, backoff = ?backoff, "Run failed, backing off before restart");
        }

        backoff
    }

    pub fn total_restarts(&self) -> u64 {
        self.total_restarts
    }
}

impl Default for RestartTracker {
    fn default() -> Self {
        Self::new(RestartPolicy::default())
    }
}
