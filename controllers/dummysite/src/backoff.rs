//! # Reconnect Backoff
//!
//! Delay policies used by the watch loop between reconnect attempts, and the
//! sleeper that waits them out.
//!
//! `FixedBackoff` waits the same interval every time (5s by default).
//! `FibonacciBackoff` grows more slowly than exponential backoff:
//! with a 5s minimum and 60s cap the sequence is 5s, 5s, 10s, 15s, 25s, 40s, 60s (max).

use std::fmt::Debug;
use std::time::Duration;

/// Policy deciding how long to wait before the next reconnect attempt.
pub trait ReconnectBackoff: Send + Debug {
    /// Get the next delay and advance the policy
    fn next_delay(&mut self) -> Duration;

    /// Return to the initial delay after a successful connection
    fn reset(&mut self);
}

/// Constant reconnect delay
#[derive(Debug, Clone)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Create a backoff that always waits `delay`
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ReconnectBackoff for FixedBackoff {
    fn next_delay(&mut self) -> Duration {
        self.delay
    }

    fn reset(&mut self) {}
}

/// Fibonacci backoff calculator
///
/// Generates backoff durations following the Fibonacci sequence in seconds.
/// Each backoff is the sum of the previous two backoffs, capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_secs: u64,
    /// Previous backoff value in seconds
    prev_secs: u64,
    /// Current backoff value in seconds
    current_secs: u64,
    /// Maximum backoff value in seconds
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values in seconds
    ///
    /// # Arguments
    ///
    /// * `min_secs` - Minimum backoff duration (used for the first two values)
    /// * `max_secs` - Maximum backoff duration (caps the sequence)
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;

        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next, self.max_secs);

        result
    }
}

impl ReconnectBackoff for FibonacciBackoff {
    fn next_delay(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}

/// Waits out reconnect delays.
///
/// Injected into the watch loop so tests can skip real sleeping.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the caller for `delay`
    async fn sleep(&self, delay: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
