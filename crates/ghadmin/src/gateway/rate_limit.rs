use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::retry::{RetryConfig, with_retry};
use crate::sync::{DEFAULT_THROTTLE_MAX_WAIT, DEFAULT_THROTTLE_RETRIES};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub mod rate_limits {
    /// Sustained budget is 5000 requests/hour; 10/sec leaves room for bursts.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
    /// Wait applied to a secondary limit that carries no retry hint.
    pub const SECONDARY_LIMIT_WAIT_SECS: u64 = 60;
}

/// Proactive pacing shared by every request of one connection.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter; a rate of zero is treated as one per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Resolves once the next request fits the quota.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// How long and how often to wait out a throttled response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub max_retries: u32,
    pub max_wait: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_THROTTLE_RETRIES,
            max_wait: DEFAULT_THROTTLE_MAX_WAIT,
        }
    }
}

/// Reset instant advertised by `x-ratelimit-reset`, if any.
pub fn rate_limit_reset(response: &HttpResponse) -> Option<DateTime<Utc>> {
    response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Whether the response is a primary or secondary rate limit rejection.
pub fn is_throttled(response: &HttpResponse) -> bool {
    match response.status {
        429 => true,
        403 => {
            response.header("retry-after").is_some()
                || response
                    .header("x-ratelimit-remaining")
                    .is_some_and(|v| v.trim() == "0")
        }
        _ => false,
    }
}

/// Delay the server asks for before retrying, or `None` when not throttled.
///
/// `retry-after` wins over `x-ratelimit-reset`; with neither present the
/// secondary limit default applies.
pub fn throttle_delay(response: &HttpResponse, now: DateTime<Utc>) -> Option<Duration> {
    if !is_throttled(response) {
        return None;
    }

    if let Some(secs) = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_secs(secs));
    }

    if let Some(reset_at) = rate_limit_reset(response) {
        let secs = (reset_at - now).num_seconds().max(1);
        return Some(Duration::from_secs(secs.unsigned_abs()));
    }

    Some(Duration::from_secs(rate_limits::SECONDARY_LIMIT_WAIT_SECS))
}

/// Transport decorator that paces requests and absorbs throttling.
///
/// Each attempt first waits on the proactive limiter, then sends with
/// exponential backoff on transport failures. A throttled response is slept
/// out (capped at `max_wait`) and retried up to `max_retries` times; after
/// that the throttled response is returned for the caller to map.
pub struct RateLimitedTransport<T> {
    inner: T,
    limiter: Option<ApiRateLimiter>,
    policy: ThrottlePolicy,
    retry: RetryConfig,
}

impl<T> RateLimitedTransport<T> {
    pub fn new(inner: T, requests_per_second: Option<u32>) -> Self {
        Self {
            inner,
            limiter: requests_per_second.map(ApiRateLimiter::new),
            policy: ThrottlePolicy::default(),
            retry: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ThrottlePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get a reference to the inner transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RateLimitedTransport<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let label = format!("{} {}", request.method, request.url);
        let mut throttled = 0;

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.wait().await;
            }

            let response = with_retry(
                &self.retry,
                &label,
                || self.inner.send(request.clone()),
                HttpError::is_transient,
            )
            .await?;

            let Some(delay) = throttle_delay(&response, Utc::now()) else {
                return Ok(response);
            };

            if throttled >= self.policy.max_retries {
                tracing::warn!(
                    request = %label,
                    status = response.status,
                    attempts = throttled + 1,
                    "Still throttled, giving up"
                );
                return Ok(response);
            }

            throttled += 1;
            let delay = delay.min(self.policy.max_wait);
            tracing::warn!(
                request = %label,
                status = response.status,
                attempt = throttled,
                delay = ?delay,
                "Throttled, waiting before retry"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
