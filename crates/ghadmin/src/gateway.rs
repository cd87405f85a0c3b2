//! Capability interface over the GitHub administration API.
//!
//! Everything above this module talks to a [`Gateway`]; the REST
//! implementation lives in [`crate::github`] and tests substitute an in-memory
//! fake.
//!
//! # Example
//!
//! ```ignore
//! use ghadmin::gateway::{Gateway, collect_pages};
//!
//! async fn count_repos(gateway: &dyn Gateway, org: &str) -> ghadmin::gateway::Result<usize> {
//!     let repos = collect_pages(|page| gateway.list_repositories_for_org(org, page)).await?;
//!     Ok(repos.len())
//! }
//! ```

mod errors;
mod pagination;
mod rate_limit;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use errors::{GatewayError, Result, short_error_message};
pub use pagination::{LinkPagination, collect_pages, parse_link_header};
pub use rate_limit::{
    ApiRateLimiter, RateLimitedTransport, ThrottlePolicy, is_throttled, rate_limit_reset,
    rate_limits, throttle_delay,
};
pub use types::{
    BranchRecord, Gateway, GatewayConnector, OrgRecord, Page, RepoPermissions, RepoRecord,
    TeamRecord, UserInfo,
};
