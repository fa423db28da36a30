//! Retry logic with exponential backoff

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use crate::{
    errors::{BotError, BotResult},
    types::VenueId,
};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

/// Delay before retry number `attempt` (1-based), capped at `max_delay_ms`
/// and jittered by up to 5% either way.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    let base = config.initial_delay_ms as f64 * config.exponential_base.powi(exponent);
    let capped = base.min(config.max_delay_ms as f64);
    let jitter = capped * 0.1 * (rand::random::<f64>() - 0.5);
    Duration::from_millis((capped + jitter).max(0.0) as u64)
}

/// Runs `operation` against `venue` with a per-attempt timeout.
///
/// Only transient errors (network failures, timeouts) are retried. Stale or
/// permanent errors are returned as-is on the first occurrence. Exhausting
/// the attempt budget yields `BotError::VenueUnavailable`.
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    venue: &VenueId,
    attempt_timeout: Duration,
) -> BotResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = BotResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(BotError::Network {
                message: format!("timed out after {}ms", attempt_timeout.as_millis()),
                source: None,
                retry_count: attempt,
            }),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!(venue = %venue, attempt, "venue call recovered");
                }
                return Ok(value);
            }
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                return Err(BotError::VenueUnavailable {
                    venue: venue.clone(),
                    message: e.to_string(),
                    attempts: attempt,
                });
            }
            Err(e) => {
                let delay = backoff_delay(config, attempt);
                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt,
                    max_attempts,
                    venue,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
