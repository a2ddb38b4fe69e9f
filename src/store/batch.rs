//! Bulk-insert batching policy.
//!
//! Remote bulk inserts are partitioned into fixed-size batches with a short
//! rest between them so large timetable imports do not overwhelm the
//! backend. The rest is behind a trait so tests run without real delays.

use std::time::Duration;

use async_trait::async_trait;

/// How bulk inserts are partitioned and paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Records per remote insert.
    pub size: usize,
    /// Rest between consecutive batches.
    pub pause: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            size: 50,
            pause: Duration::from_millis(100),
        }
    }
}

impl BatchPolicy {
    /// Policy with the default batch size and no rest between batches.
    pub fn without_pause() -> Self {
        Self {
            pause: Duration::ZERO,
            ..Default::default()
        }
    }
}

/// Rest taken between consecutive remote batches.
#[async_trait]
pub trait BatchPacer: Send + Sync {
    async fn rest(&self);
}

/// Unconditional fixed delay between batches. Not a backoff: the delay does
/// not respond to observed latency or failures.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelayPacer {
    delay: Duration,
}

impl FixedDelayPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl BatchPacer for FixedDelayPacer {
    async fn rest(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Pacer that never waits; inject into tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPacer;

#[async_trait]
impl BatchPacer for NoopPacer {
    async fn rest(&self) {}
}
