//! Events pushed to the host.
//!
//! The engine never blocks on the host: an [`EventSink`] is a plain callback,
//! and the channel-backed sink uses an unbounded queue.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::model::{OrgStatus, RepoSummary, Team};

/// Which half of an organization fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    Repos,
    Teams,
}

/// Events emitted by the session manager and fetch passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum SyncEvent {
    /// Connection, polling or organization selection changed.
    StatusUpdated(OrgStatus),

    /// Fresh repository list for one organization.
    ReposUpdated {
        org: String,
        repos: Vec<RepoSummary>,
    },

    /// Fresh team list for one organization (empty for a personal account).
    TeamsUpdated { org: String, teams: Vec<Team> },

    /// One organization's repository or team fetch failed.
    FetchError {
        org: String,
        kind: FetchKind,
        message: String,
    },
}

impl SyncEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::StatusUpdated(_) => "status-updated",
            SyncEvent::ReposUpdated { .. } => "repos-updated",
            SyncEvent::TeamsUpdated { .. } => "teams-updated",
            SyncEvent::FetchError { .. } => "fetch-error",
        }
    }
}

/// Callback receiving every [`SyncEvent`].
#[derive(Clone)]
pub struct EventSink(Arc<dyn Fn(SyncEvent) + Send + Sync>);

impl EventSink {
    pub fn new(f: impl Fn(SyncEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A sink that drops every event.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// A sink feeding an unbounded channel. Events sent after the receiver is
    /// dropped are discarded.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self::new(move |event| {
            let _ = tx.send(event);
        });
        (sink, rx)
    }

    #[inline]
    pub fn emit(&self, event: SyncEvent) {
        (self.0)(event);
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}
