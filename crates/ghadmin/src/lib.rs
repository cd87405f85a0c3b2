//! ghadmin - Organization administration for GitHub.
//!
//! This library keeps a view of one or more GitHub organizations in sync for
//! a host application and applies bulk administrative changes across many
//! repositories: topics, team access, custom properties, branch protection
//! and rulesets.
//!
//! The host drives an [`AdminService`] and receives results through an
//! [`EventSink`]. All remote calls go through the [`gateway::Gateway`]
//! capability interface, implemented over REST by [`GitHubConnector`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ghadmin::{AdminService, EngineOptions, EventSink, GitHubConnector, MemoryConfigStore};
//!
//! let options = EngineOptions::default();
//! let (events, mut rx) = EventSink::channel();
//! let service = AdminService::new(
//!     Arc::new(GitHubConnector::new(&options)),
//!     Arc::new(MemoryConfigStore::default()),
//!     events,
//!     options,
//! );
//!
//! let status = service.connect("ghp_...").await?;
//! println!("Organizations: {:?}", status.organizations);
//!
//! let report = service
//!     .bulk_update_topics(&["acme/widgets".into()], &["rust".into()], "add")
//!     .await?;
//! ```

pub mod bulk;
pub mod error;
pub mod events;
pub mod gateway;
pub mod github;
pub mod http;
pub mod model;
pub mod retry;
pub mod session;
pub mod settings;
pub mod sync;
pub mod topics;

pub use bulk::{BulkReport, ItemOutcome, parse_full_name};
pub use error::{AdminError, Result};
pub use events::{EventSink, FetchKind, SyncEvent};
pub use gateway::{Gateway, GatewayConnector, GatewayError};
pub use github::{GitHubClient, GitHubConnector};
pub use model::{
    BranchProtectionDetail, BranchProtectionRequest, BranchRestrictions,
    CustomPropertyDefinition, CustomPropertyValue, OrgStatus, RepoDetail, RepoSummary, RepoTeam,
    RequiredPullRequestReviews, RequiredStatusChecks, Ruleset, Team, Visibility,
};
pub use session::{AdminService, resolve_selected_org};
pub use settings::{ConfigStore, MemoryConfigStore, Settings, SettingsError};
pub use sync::EngineOptions;
pub use topics::{TopicMode, combine};
