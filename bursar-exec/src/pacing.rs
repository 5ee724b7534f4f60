//! Inter-recipient pacing policy for batch distributions.
//!
//! The delay between consecutive recipients is a resource-sharing policy
//! protecting the shared gateway and ledger network from rate-limit
//! rejection. It is not a correctness requirement: any implementation may
//! be substituted as long as recipient order and total attempt count are
//! preserved. Tests inject `NoPacing`.

use async_trait::async_trait;
use std::time::Duration;

/// Pacing policy awaited between consecutive recipients of a distribution.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait before the next recipient is attempted.
    async fn pace(&self);
}

/// Fixed delay between consecutive recipients.
pub struct FixedInterval {
    delay: Duration,
}

impl FixedInterval {
    /// Create a pacer with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Create a pacer from a millisecond delay.
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }
}

#[async_trait]
impl Pacer for FixedInterval {
    async fn pace(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

/// Zero-delay pacing for tests and local stubs.
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pace(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_interval_waits() {
        let pacer = FixedInterval::from_millis(20);
        let started = tokio::time::Instant::now();
        pacer.pace().await;
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_no_pacing_returns_immediately() {
        let pacer = NoPacing;
        let started = tokio::time::Instant::now();
        pacer.pace().await;
        assert!(started.elapsed() < Duration::from_millis(5));
    }
}
