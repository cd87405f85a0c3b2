//! Background synchronization of organization state.
//!
//! # Module Structure
//!
//! - `types` - `EngineOptions` and the engine constants
//! - `convert` - Gateway records to host-facing models
//! - [`fetch`] - Per-organization fetch passes: `fetch_all()`, `fetch_all_orgs()`
//! - [`detail`] - Repository detail aggregation: `get_repo_detail()`
//! - [`scheduler`] - The background poll loop: `PollScheduler`
//!
//! # Example
//!
//! ```ignore
//! use ghadmin::events::EventSink;
//! use ghadmin::sync::{FetchContext, PollScheduler, DEFAULT_POLL_INTERVAL};
//!
//! let ctx = FetchContext::new(gateway, "alice", EventSink::noop(), 10);
//! let scheduler = PollScheduler::start(ctx, || vec!["alice".into(), "acme".into()], DEFAULT_POLL_INTERVAL);
//! // ...
//! scheduler.stop();
//! ```

mod convert;
pub mod detail;
pub mod fetch;
pub mod scheduler;
mod types;

pub use types::EngineOptions;

pub use types::{
    DEFAULT_API_URL, DEFAULT_PER_PAGE, DEFAULT_POLL_INTERVAL, DEFAULT_TEAM_LOOKUP_CONCURRENCY,
    DEFAULT_THROTTLE_MAX_WAIT, DEFAULT_THROTTLE_RETRIES, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS,
    MAX_TRANSIENT_RETRIES,
};

pub use detail::get_repo_detail;
pub use fetch::{FetchContext, fetch_all, fetch_all_orgs, fetch_repo_list, fetch_team_list};
pub use scheduler::PollScheduler;
