pub(crate) mod meta;
pub(crate) mod mutate;
pub(crate) mod repos;
pub(crate) mod session;
pub(crate) mod watch;

use std::sync::Arc;

use ghadmin::settings::load_or_default;
use ghadmin::{AdminError, AdminService, EventSink, GitHubConnector, OrgStatus, Settings, SyncEvent};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::{Config, FileConfigStore};

/// An engine instance wired to the user config file, plus its event stream.
pub(crate) struct Host {
    pub service: AdminService,
    pub events: UnboundedReceiver<SyncEvent>,
    pub store: FileConfigStore,
}

impl Host {
    /// Build a disconnected service. `poll` decides whether a successful
    /// connection starts the background scheduler.
    pub(crate) fn new(config: &Config, poll: bool) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_store(config, poll, FileConfigStore::at_default_path()?))
    }

    fn with_store(config: &Config, poll: bool, store: FileConfigStore) -> Self {
        let options = config.engine_options(poll);
        let (sink, events) = EventSink::channel();
        let service = AdminService::new(
            Arc::new(GitHubConnector::new(&options)),
            Arc::new(store.clone()),
            sink,
            options,
        );
        Self {
            service,
            events,
            store,
        }
    }

    /// Build a service and try to connect with the configured token.
    ///
    /// The selection saved by an earlier command is passed on as the previous
    /// one, so it wins over the default organization while it is listed.
    pub(crate) async fn resume(
        config: &Config,
        poll: bool,
    ) -> Result<(Self, Resume), Box<dyn std::error::Error>> {
        let store = FileConfigStore::at_default_path()?;
        let stored = load_or_default(&store);
        let Some((token, external)) = session_token(config, &stored) else {
            return Ok((Self::with_store(config, poll, store), Resume::NoToken));
        };

        let store = if external {
            store.with_external_token(Some(token.clone()))
        } else {
            store
        };
        let host = Self::with_store(config, poll, store);
        let previous = stored.selected_org.unwrap_or_default();
        let outcome = match host.service.connect_with_selection(&token, &previous).await {
            Ok(status) => Resume::Connected(status),
            Err(e) => Resume::Rejected(e),
        };
        Ok((host, outcome))
    }

    /// Like [`Host::resume`], but anything short of a connection is an error.
    pub(crate) async fn connected(
        config: &Config,
        poll: bool,
    ) -> Result<(Self, OrgStatus), Box<dyn std::error::Error>> {
        let (host, outcome) = Self::resume(config, poll).await?;
        match outcome {
            Resume::Connected(status) => Ok((host, status)),
            Resume::NoToken => Err(NOT_LOGGED_IN.into()),
            Resume::Rejected(e) => Err(rejected_message(&e).into()),
        }
    }

    /// Every event emitted so far.
    pub(crate) fn drain(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

const NOT_LOGGED_IN: &str =
    "Not logged in. Run `ghadmin login --token <TOKEN>` or set GHADMIN_GITHUB_TOKEN.";

/// Result of connecting with the configured token.
pub(crate) enum Resume {
    Connected(OrgStatus),
    NoToken,
    Rejected(AdminError),
}

pub(crate) fn rejected_message(error: &AdminError) -> String {
    format!("Could not connect with the configured token: {error}. Run `ghadmin login --token <TOKEN>` with a valid token.")
}

/// The token to connect with, and whether it came from somewhere other than
/// the user config file (environment or `./ghadmin.toml`).
fn session_token(config: &Config, stored: &Settings) -> Option<(String, bool)> {
    let token = config.github_token()?;
    let external = stored.token.as_deref() != Some(token.as_str());
    Some((token, external))
}

/// The organization named on the command line, else the selected one.
pub(crate) fn target_org(
    requested: Option<String>,
    status: &OrgStatus,
) -> Result<String, Box<dyn std::error::Error>> {
    match requested.filter(|o| !o.is_empty()) {
        Some(org) => Ok(org),
        None if !status.selected_org.is_empty() => Ok(status.selected_org.clone()),
        None => Err("No organization selected. Pass --org or run `ghadmin org select <ORG>`.".into()),
    }
}
