//! Fixed-interval retry policy shared by the dial and receive loops

use std::time::Duration;

/// Delay applied after a failed dial and after a lost connection
pub const LOOP_DELAY_ON_DISPATCHER_ERROR: Duration = Duration::from_secs(1);

/// How long the connection manager backs off before trying again.
///
/// There is no attempt limit: the manager retries until it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
}

impl RetryPolicy {
    pub const fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// No delay between attempts
    pub const fn immediate() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep for one backoff interval
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            // Zero interval still yields to the scheduler
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(LOOP_DELAY_ON_DISPATCHER_ERROR)
    }
}
