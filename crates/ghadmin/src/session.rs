//! The session manager and host-facing operation surface.
//!
//! [`AdminService`] owns the authenticated gateway, the organization status
//! and the poll scheduler. Every write to the status happens while the
//! session lock is held, so there is one writer at a time; readers take a
//! snapshot through [`AdminService::status`] without waiting on that lock.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::bulk::{self, BulkReport};
use crate::error::{AdminError, Result};
use crate::events::{EventSink, SyncEvent};
use crate::gateway::{Gateway, GatewayConnector, collect_pages};
use crate::model::{
    BranchProtectionRequest, CustomPropertyDefinition, OrgStatus, RepoDetail, Ruleset,
};
use crate::settings::{self, ConfigStore, load_or_default, non_empty};
use crate::sync::{EngineOptions, FetchContext, PollScheduler, fetch_all, get_repo_detail};
use crate::topics::TopicMode;

#[derive(Default)]
struct Session {
    token: String,
    gateway: Option<Arc<dyn Gateway>>,
    login: String,
    scheduler: Option<PollScheduler>,
    on_demand: Vec<AbortHandle>,
}

impl Session {
    /// Stop the scheduler and abort on-demand fetches still running.
    fn halt(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
        for fetch in self.on_demand.drain(..) {
            fetch.abort();
        }
    }
}

/// Pick the organization to select after connecting.
///
/// The previous selection wins if it is still in the list, then the
/// configured default, then the first organization. An empty list yields an
/// empty selection.
#[must_use]
pub fn resolve_selected_org(previous: &str, default_org: &str, organizations: &[String]) -> String {
    let listed = |org: &str| !org.is_empty() && organizations.iter().any(|o| o == org);

    if listed(previous) {
        previous.to_string()
    } else if listed(default_org) {
        default_org.to_string()
    } else {
        organizations.first().cloned().unwrap_or_default()
    }
}

/// Session manager, poll scheduler owner and mutation entry point.
pub struct AdminService {
    connector: Arc<dyn GatewayConnector>,
    store: Arc<dyn ConfigStore>,
    events: EventSink,
    options: EngineOptions,
    session: Mutex<Session>,
    status: Arc<RwLock<OrgStatus>>,
}

impl std::fmt::Debug for AdminService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminService")
            .field("status", &self.status())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AdminService {
    pub fn new(
        connector: Arc<dyn GatewayConnector>,
        store: Arc<dyn ConfigStore>,
        events: EventSink,
        options: EngineOptions,
    ) -> Self {
        Self {
            connector,
            store,
            events,
            options,
            session: Mutex::new(Session::default()),
            status: Arc::new(RwLock::new(OrgStatus::default())),
        }
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> OrgStatus {
        self.status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn update_status(&self, apply: impl FnOnce(&mut OrgStatus)) -> OrgStatus {
        let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut status);
        status.clone()
    }

    fn publish(&self, status: &OrgStatus) {
        self.events.emit(SyncEvent::StatusUpdated(status.clone()));
    }

    // ─── Connection lifecycle ───────────────────────────────────────────────

    /// Connect with the stored token, if there is one.
    ///
    /// A configured default organization takes precedence over the stored
    /// selection. Failure is logged and leaves the service disconnected.
    pub async fn startup(&self) -> OrgStatus {
        let stored = load_or_default(self.store.as_ref());
        let Some(token) = stored.token.filter(|t| !t.is_empty()) else {
            debug!("No stored token, staying disconnected");
            return self.status();
        };

        let previous = if stored.default_org.as_deref().is_some_and(|d| !d.is_empty()) {
            String::new()
        } else {
            stored.selected_org.unwrap_or_default()
        };

        match self.connect_with(&token, &previous).await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Auto-connect failed");
                self.status()
            }
        }
    }

    /// Verify `token`, list organizations and start polling.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Auth`] when the token is rejected. The previous
    /// session, if any, is left as it was.
    pub async fn connect(&self, token: &str) -> Result<OrgStatus> {
        let previous = self.status().selected_org;
        self.connect_with(token, &previous).await
    }

    /// Connect treating `previous` as the last selection, which wins over the
    /// default organization when it is still listed.
    ///
    /// Hosts that run one command per process pass the stored selection here
    /// so that a selection made by an earlier run sticks.
    ///
    /// # Errors
    ///
    /// Returns [`AdminError::Auth`] when the token is rejected.
    pub async fn connect_with_selection(&self, token: &str, previous: &str) -> Result<OrgStatus> {
        self.connect_with(token, previous).await
    }

    async fn connect_with(&self, token: &str, previous: &str) -> Result<OrgStatus> {
        let gateway = self.connector.connect(token).map_err(AdminError::Auth)?;
        let user = gateway
            .get_authenticated_user()
            .await
            .map_err(AdminError::Auth)?;
        info!(login = %user.login, "Connected");

        let mut session = self.session.lock().await;
        session.halt();

        let organizations = list_organizations(gateway.as_ref(), &user.login).await;
        let default_org = load_or_default(self.store.as_ref())
            .default_org
            .unwrap_or_default();
        let selected = resolve_selected_org(previous, &default_org, &organizations);

        *session = Session {
            token: token.to_string(),
            gateway: Some(gateway),
            login: user.login,
            ..Session::default()
        };

        let status = self.update_status(|status| {
            *status = OrgStatus {
                is_connected: true,
                is_polling: false,
                organizations,
                selected_org: selected.clone(),
                default_org,
            };
        });
        settings::update(self.store.as_ref(), |s| {
            s.token = Some(token.to_string());
            s.selected_org = non_empty(&selected);
        });
        self.publish(&status);

        if self.options.poll_on_connect {
            return Ok(self.start_polling_locked(&mut session));
        }
        Ok(status)
    }

    /// Stop polling and forget the session.
    pub async fn disconnect(&self) -> OrgStatus {
        let mut session = self.session.lock().await;
        session.halt();
        *session = Session::default();

        let status = self.update_status(|status| *status = OrgStatus::default());
        settings::update(self.store.as_ref(), |s| {
            s.token = None;
            s.selected_org = None;
        });
        self.publish(&status);
        info!("Disconnected");
        status
    }

    // ─── Organization selection ─────────────────────────────────────────────

    /// Select `org` and fetch it right away in the background.
    ///
    /// The organization is not checked against the list. Returns the fetch
    /// task when connected; a disconnect aborts it.
    pub async fn select_organization(&self, org: &str) -> Option<JoinHandle<()>> {
        let mut session = self.session.lock().await;

        let status = self.update_status(|status| status.selected_org = org.to_string());
        settings::update(self.store.as_ref(), |s| {
            s.token = non_empty(&session.token);
            s.selected_org = non_empty(org);
        });
        self.publish(&status);

        if org.is_empty() {
            return None;
        }
        let ctx = self.fetch_context(&session)?;
        let org = org.to_string();
        let fetch = tokio::spawn(async move { fetch_all(&ctx, &org).await });
        session.on_demand.retain(|f| !f.is_finished());
        session.on_demand.push(fetch.abort_handle());
        Some(fetch)
    }

    /// Record `org` as the default. Does not fetch anything.
    pub async fn set_default_organization(&self, org: &str) -> OrgStatus {
        let _session = self.session.lock().await;

        let status = self.update_status(|status| status.default_org = org.to_string());
        settings::update(self.store.as_ref(), |s| s.default_org = non_empty(org));
        self.publish(&status);
        status
    }

    /// Fetch one organization now, outside the poll schedule. Results arrive
    /// as events; nothing happens when disconnected.
    pub async fn refresh_organization(&self, org: &str) {
        let ctx = {
            let session = self.session.lock().await;
            self.fetch_context(&session)
        };
        match ctx {
            Some(ctx) => fetch_all(&ctx, org).await,
            None => debug!(org = %org, "Refresh skipped, not connected"),
        }
    }

    fn fetch_context(&self, session: &Session) -> Option<FetchContext> {
        let gateway = session.gateway.clone()?;
        Some(FetchContext::new(
            gateway,
            session.login.clone(),
            self.events.clone(),
            self.options.team_lookup_concurrency,
        ))
    }

    // ─── Polling ────────────────────────────────────────────────────────────

    /// Start the poll scheduler. No-op when disconnected or already polling.
    pub async fn start_polling(&self) -> OrgStatus {
        let mut session = self.session.lock().await;
        self.start_polling_locked(&mut session)
    }

    /// Stop the poll scheduler. No-op when not polling.
    pub async fn stop_polling(&self) -> OrgStatus {
        let mut session = self.session.lock().await;
        self.stop_polling_locked(&mut session)
    }

    fn start_polling_locked(&self, session: &mut Session) -> OrgStatus {
        if session.scheduler.as_ref().is_some_and(|s| !s.is_finished()) {
            return self.status();
        }
        let Some(ctx) = self.fetch_context(session) else {
            return self.status();
        };

        let status_source = Arc::clone(&self.status);
        let organizations = move || {
            status_source
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .organizations
                .clone()
        };
        session.scheduler = Some(PollScheduler::start(
            ctx,
            organizations,
            self.options.poll_interval,
        ));

        let status = self.update_status(|status| status.is_polling = true);
        self.publish(&status);
        status
    }

    fn stop_polling_locked(&self, session: &mut Session) -> OrgStatus {
        let Some(scheduler) = session.scheduler.take() else {
            return self.status();
        };
        scheduler.stop();

        let status = self.update_status(|status| status.is_polling = false);
        self.publish(&status);
        status
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    async fn gateway(&self) -> Result<Arc<dyn Gateway>> {
        self.session
            .lock()
            .await
            .gateway
            .clone()
            .ok_or(AdminError::NotConnected)
    }

    /// Enriched view of one repository.
    pub async fn get_repository_detail(&self, owner: &str, repo: &str) -> Result<RepoDetail> {
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(get_repo_detail(gateway.as_ref(), owner, repo).await?)
    }

    /// The custom property schema of `org`.
    pub async fn get_custom_property_definitions(
        &self,
        org: &str,
    ) -> Result<Vec<CustomPropertyDefinition>> {
        let gateway = self.gateway().await?;
        Ok(gateway.get_all_custom_property_definitions(org).await?)
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    /// Change one repository's topics. `mode` is `replace`, `add` or `remove`.
    ///
    /// # Errors
    ///
    /// [`AdminError::InvalidArgument`] for an unknown mode, before anything
    /// is sent.
    pub async fn update_topics(
        &self,
        owner: &str,
        repo: &str,
        topics: &[String],
        mode: &str,
    ) -> Result<Vec<String>> {
        let mode: TopicMode = mode.parse()?;
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(bulk::update_topics(gateway.as_ref(), owner, repo, topics, mode).await?)
    }

    /// Change topics on many repositories. Per-repository failures end up in
    /// the report, never in the `Err` branch.
    pub async fn bulk_update_topics(
        &self,
        repos: &[String],
        topics: &[String],
        mode: &str,
    ) -> Result<BulkReport> {
        let mode: TopicMode = mode.parse()?;
        let gateway = self.gateway().await?;
        Ok(bulk::bulk_update_topics(gateway.as_ref(), repos, topics, mode).await)
    }

    pub async fn update_team_access(
        &self,
        owner: &str,
        repo: &str,
        org: &str,
        team_slug: &str,
        permission: &str,
        remove: bool,
    ) -> Result<()> {
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(bulk::update_team_access(
            gateway.as_ref(),
            owner,
            repo,
            org,
            team_slug,
            permission,
            remove,
        )
        .await?)
    }

    pub async fn bulk_update_team_access(
        &self,
        repos: &[String],
        org: &str,
        team_slug: &str,
        permission: &str,
        remove: bool,
    ) -> Result<BulkReport> {
        let gateway = self.gateway().await?;
        Ok(bulk::bulk_update_team_access(
            gateway.as_ref(),
            repos,
            org,
            team_slug,
            permission,
            remove,
        )
        .await)
    }

    pub async fn update_custom_properties(
        &self,
        org: &str,
        repo: &str,
        properties: &BTreeMap<String, Value>,
    ) -> Result<()> {
        if repo.is_empty() || repo.contains('/') {
            return Err(AdminError::InvalidRepoName(repo.to_string()));
        }
        let gateway = self.gateway().await?;
        Ok(bulk::update_custom_properties(gateway.as_ref(), org, repo, properties).await?)
    }

    /// Set properties on many repositories of `org` in one batch write.
    /// Entries may be `owner/repo` or bare repository names.
    pub async fn bulk_update_custom_properties(
        &self,
        org: &str,
        repos: &[String],
        properties: &BTreeMap<String, Value>,
    ) -> Result<BulkReport> {
        let gateway = self.gateway().await?;
        Ok(bulk::bulk_update_custom_properties(gateway.as_ref(), org, repos, properties).await)
    }

    pub async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<Value> {
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(gateway
            .update_branch_protection(owner, repo, branch, request)
            .await?)
    }

    pub async fn bulk_update_branch_protection(
        &self,
        repos: &[String],
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<BulkReport> {
        let gateway = self.gateway().await?;
        Ok(bulk::bulk_update_branch_protection(gateway.as_ref(), repos, branch, request).await)
    }

    pub async fn delete_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<()> {
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(gateway.remove_branch_protection(owner, repo, branch).await?)
    }

    pub async fn create_ruleset(&self, owner: &str, repo: &str, ruleset: &Ruleset) -> Result<Ruleset> {
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(gateway.create_ruleset(owner, repo, ruleset).await?)
    }

    pub async fn update_ruleset(
        &self,
        owner: &str,
        repo: &str,
        id: i64,
        ruleset: &Ruleset,
    ) -> Result<Ruleset> {
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(gateway.update_ruleset(owner, repo, id, ruleset).await?)
    }

    pub async fn delete_ruleset(&self, owner: &str, repo: &str, id: i64) -> Result<()> {
        check_repo(owner, repo)?;
        let gateway = self.gateway().await?;
        Ok(gateway.delete_ruleset(owner, repo, id).await?)
    }
}

fn check_repo(owner: &str, repo: &str) -> Result<()> {
    let full_name = format!("{owner}/{repo}");
    match bulk::parse_full_name(&full_name) {
        Some(_) => Ok(()),
        None => Err(AdminError::InvalidRepoName(full_name)),
    }
}

/// The user's login followed by every organization it belongs to. A listing
/// failure leaves just the login.
async fn list_organizations(gateway: &dyn Gateway, login: &str) -> Vec<String> {
    let mut organizations = vec![login.to_string()];
    match collect_pages(|page| gateway.list_organizations(page)).await {
        Ok(orgs) => organizations.extend(
            orgs.into_iter()
                .map(|o| o.login)
                .filter(|o| o != login),
        ),
        Err(e) => warn!(login = %login, error = %e, "Organization listing failed"),
    }
    organizations
}
