//! Delays applied between reconnection attempts

use rand::Rng;
use std::time::Duration;

/// Policy deciding how long to wait before the next reconnection attempt
pub trait BackoffPolicy: Send + Sync {
    /// Duration to sleep before the next attempt
    fn next_delay(&self) -> Duration;
}

/// Backoff drawing each delay uniformly from a fixed range
///
/// Unlike an exponential backoff, the delay does not grow with the number of failed attempts.
/// The jitter prevents multiple consumers from hammering a recovering broker in lockstep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitteredBackoff {
    min: Duration,
    max: Duration,
}

impl JitteredBackoff {
    /// Creates a new instance drawing from `[min, max]`; the bounds are swapped if necessary
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

impl Default for JitteredBackoff {
    /// Draws from `[0.5s, 1.5s]`
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(1500))
    }
}

impl BackoffPolicy for JitteredBackoff {
    fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;

        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Backoff which always waits for the same duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff(pub Duration);

impl FixedBackoff {
    /// Retries without waiting at all
    pub fn immediate() -> Self {
        Self(Duration::from_millis(0))
    }
}

impl BackoffPolicy for FixedBackoff {
    fn next_delay(&self) -> Duration {
        self.0
    }
}
