//! # Retry Policy Module
//!
//! Reusable backoff policy for operations that may fail on transient
//! connectivity problems. The policy is a plain value; `retry` applies it to
//! any async operation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

/// Delay between attempts to resolve the bot identity at startup
pub const BOOTSTRAP_BASE_DELAY_MS: u64 = 5_000;
/// Attempts before startup gives up
pub const BOOTSTRAP_MAX_ATTEMPTS: u32 = 5;
/// Fixed interval between polling retries
pub const POLLING_RETRY_DELAY_MS: u64 = 10_000;

/// Backoff configuration for a retried operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, `None` retries forever
    pub max_attempts: Option<u32>,
    /// Delay before the second attempt in milliseconds
    pub base_delay_ms: u64,
    /// Factor applied to the delay after every failed attempt
    pub multiplier: f64,
    /// Upper bound for a single delay in milliseconds
    pub max_delay_ms: u64,
    /// Random jitter added to each delay, as a fraction of it
    pub jitter: f64,
}

impl RetryPolicy {
    /// Bounded exponential backoff used while resolving the bot identity
    pub fn bootstrap() -> Self {
        Self {
            max_attempts: Some(BOOTSTRAP_MAX_ATTEMPTS),
            base_delay_ms: BOOTSTRAP_BASE_DELAY_MS,
            multiplier: 2.0,
            max_delay_ms: 120_000,
            jitter: 0.1,
        }
    }

    /// Never gives up, waits a fixed interval between attempts
    pub fn polling() -> Self {
        Self {
            max_attempts: None,
            base_delay_ms: POLLING_RETRY_DELAY_MS,
            multiplier: 1.0,
            max_delay_ms: POLLING_RETRY_DELAY_MS,
            jitter: 0.0,
        }
    }

    /// Delay without jitter after the given number of failed attempts (1-based)
    pub fn base_delay_for(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(63) as i32;
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = raw.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Delay with jitter applied
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let base = self.base_delay_for(failed_attempts);
        if self.jitter <= 0.0 {
            return base;
        }
        let spread = base.as_millis() as f64 * self.jitter;
        let extra = rand::thread_rng().gen_range(0.0..=spread);
        base + Duration::from_millis(extra as u64)
    }

    /// Whether another attempt is allowed after `failed_attempts` failures
    pub fn allows_another(&self, failed_attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| failed_attempts < max)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Returns the last error once a bounded policy runs out of attempts.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut failed_attempts = 0u32;
    loop {
        match op().await {
            Ok(value) => {
                if failed_attempts > 0 {
                    info!(operation, attempts = failed_attempts + 1, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) => {
                failed_attempts += 1;
                if !policy.allows_another(failed_attempts) {
                    warn!(operation, attempts = failed_attempts, error = %e, "Giving up");
                    return Err(e);
                }
                let delay = policy.delay_for(failed_attempts);
                warn!(
                    operation,
                    attempt = failed_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
