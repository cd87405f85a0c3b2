//! Backoff for requests that never got a response.
//!
//! A connection reset or timeout carries no hint about when to try again, so
//! these get exponential backoff with jitter. Throttled responses are a
//! different matter and are waited out by
//! [`RateLimitedTransport`](crate::gateway::RateLimitedTransport) using the
//! server's own headers.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::sync::{INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_TRANSIENT_RETRIES};

/// Exponential backoff parameters for transport failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Ceiling for any single delay.
    pub max_delay: Duration,
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: usize,
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: MAX_TRANSIENT_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all; every failure surfaces on the first attempt.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);
        if self.with_jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}

/// Run `operation`, retrying while `is_transient` holds for its error.
///
/// `label` names the request ("GET https://...") in the debug line logged
/// before each retry.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    operation: F,
    is_transient: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut retry = 0u32;

    operation
        .retry(config.backoff())
        .when(|e| is_transient(e))
        .notify(|e, delay| {
            retry += 1;
            tracing::debug!(request = %label, retry, delay = ?delay, error = %e, "Transport failure, retrying");
        })
        .await
}
