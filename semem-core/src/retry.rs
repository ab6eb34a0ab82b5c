//! Retry combinator for transient I/O failures
//!
//! SPARQL and provider HTTP calls are retried with exponential backoff when
//! the error is classified as recoverable. Non-recoverable errors surface
//! immediately.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::error::Error;

/// Counters for retry outcomes, shared across call sites
#[derive(Debug, Default)]
pub struct RetryMetrics {
    total: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
}

impl RetryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, succeeded: bool) {
        self.total.fetch_add(1, Ordering::SeqCst);
        if succeeded {
            self.success.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failure.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failure.load(Ordering::SeqCst)
    }
}

/// Backoff configuration for a retry policy
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }
}

/// Executes operations with exponential backoff on recoverable errors
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        // doubling via shift, capped before the multiply can overflow
        let doublings = attempt.saturating_sub(1).min(16);
        let base_ms = self.config.base_delay.as_millis() as u64;
        let cap_ms = self.config.max_delay.as_millis() as u64;
        let mut millis = base_ms.saturating_mul(1 << doublings).min(cap_ms);

        if self.config.jitter_factor > 0.0 {
            // scale by a uniform multiplier in [1 - j, 1 + j]
            let spread = rand::random::<f64>().mul_add(2.0, -1.0) * self.config.jitter_factor;
            millis = (millis as f64 * (1.0 + spread)).max(0.0) as u64;
        }
        Duration::from_millis(millis)
    }

    /// Run `operation`, retrying recoverable failures up to `max_retries` times
    pub async fn execute<F, T, Fut>(&self, operation: F) -> Result<T, Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_recoverable() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    attempt += 1;
                    let delay = self.backoff_delay(attempt);

                    warn!(
                        "Retry attempt {}/{} failed: {:?}, retrying in {:?}",
                        attempt, self.config.max_retries, e, delay
                    );

                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
