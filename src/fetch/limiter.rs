use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between requests issued by one fetcher.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter { min_interval, last: None }
    }

    /// Sleep for whatever is left of the interval since the last `mark`.
    pub async fn wait(&self) -> Duration {
        let Some(last) = self.last else { return Duration::ZERO };
        let elapsed = last.elapsed();
        if elapsed >= self.min_interval { return Duration::ZERO; }
        let remaining = self.min_interval - elapsed;
        debug!(sleep_ms = remaining.as_millis() as u64, "rate limiting");
        tokio::time::sleep(remaining).await;
        remaining
    }

    pub fn mark(&mut self) { self.last = Some(Instant::now()); }
}
