//! Engine tunables and their defaults.

use std::time::Duration;

use crate::gateway::{ThrottlePolicy, rate_limits};
use crate::retry::RetryConfig;

/// Time between the end of one fetch pass and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Maximum concurrent team-detail lookups during a team listing pass.
pub const DEFAULT_TEAM_LOOKUP_CONCURRENCY: usize = 10;

/// Items requested per page on paginated listings.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// REST API root for github.com.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Initial backoff delay in milliseconds for transient transport failures.
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Maximum retries for a transport failure before it surfaces.
pub const MAX_TRANSIENT_RETRIES: usize = 3;

/// Maximum throttled attempts retried before the throttled response surfaces.
pub const DEFAULT_THROTTLE_RETRIES: u32 = 5;

/// Longest single wait on a throttled response.
pub const DEFAULT_THROTTLE_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

/// Options for the session manager and everything it drives.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Delay between fetch passes, measured from the end of a pass.
    pub poll_interval: Duration,
    /// Capacity of the team member-count enrichment pool.
    pub team_lookup_concurrency: usize,
    /// Page size for listings (clamped to 1..=100 by the client).
    pub per_page: u32,
    /// Proactive request pacing; `None` disables it.
    pub requests_per_second: Option<u32>,
    /// How throttled responses are waited out.
    pub throttle: ThrottlePolicy,
    /// Backoff for transport failures.
    pub retry: RetryConfig,
    /// REST API root.
    pub api_url: String,
    /// Start the poll scheduler when a connection succeeds.
    pub poll_on_connect: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            team_lookup_concurrency: DEFAULT_TEAM_LOOKUP_CONCURRENCY,
            per_page: DEFAULT_PER_PAGE,
            requests_per_second: Some(rate_limits::GITHUB_DEFAULT_RPS),
            throttle: ThrottlePolicy::default(),
            retry: RetryConfig::default(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_on_connect: true,
        }
    }
}
