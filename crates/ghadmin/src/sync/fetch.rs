//! Per-organization fetch passes.
//!
//! A pass lists an organization's repositories and then its teams, pushing
//! each result (or the failure) to the host as an event. Team listings are
//! enriched with member counts through a bounded pool of concurrent lookups.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{EventSink, FetchKind, SyncEvent};
use crate::gateway::{
    self, Gateway, GatewayError, Page, TeamRecord, collect_pages, short_error_message,
};
use crate::model::{RepoSummary, Team};

/// Everything a fetch pass needs, cheap to clone into a background task.
#[derive(Clone)]
pub struct FetchContext {
    pub gateway: Arc<dyn Gateway>,
    /// The authenticated login, which doubles as a pseudo-organization.
    pub login: String,
    pub events: EventSink,
    pub team_lookup_concurrency: usize,
}

impl FetchContext {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        login: impl Into<String>,
        events: EventSink,
        team_lookup_concurrency: usize,
    ) -> Self {
        Self {
            gateway,
            login: login.into(),
            events,
            team_lookup_concurrency,
        }
    }
}

/// List every repository of `org`, or of the user when `org` is their login.
pub async fn fetch_repo_list(
    gateway: &dyn Gateway,
    login: &str,
    org: &str,
) -> gateway::Result<Vec<RepoSummary>> {
    let records = if org == login {
        collect_pages(|page| gateway.list_repositories_for_user(page)).await?
    } else {
        collect_pages(|page| gateway.list_repositories_for_org(org, page)).await?
    };
    debug!(org = %org, count = records.len(), "Fetched repositories");
    Ok(records.iter().map(RepoSummary::from).collect())
}

/// List every team of `org` with member counts filled in.
///
/// A personal account has no teams, so `org == login` yields an empty list
/// without calling the API. Each page's lookups finish before the next page
/// is requested, and at most `concurrency` lookups are in flight.
pub async fn fetch_team_list(
    gateway: &Arc<dyn Gateway>,
    login: &str,
    org: &str,
    concurrency: usize,
) -> gateway::Result<Vec<Team>> {
    if org == login {
        return Ok(Vec::new());
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let semaphore = &semaphore;

    let teams = collect_pages(|page| async move {
        let listing = gateway.list_teams(org, page).await?;
        debug!(org = %org, page, count = listing.items.len(), "Fetched team page");
        let items = fill_member_counts(gateway, org, listing.items, semaphore).await;
        Ok::<_, GatewayError>(Page {
            items,
            next_page: listing.next_page,
            last_page: listing.last_page,
        })
    })
    .await?;

    Ok(teams)
}

/// Look up teams whose listing reported no members, in parallel, and wait for
/// all of them. A failed lookup keeps the listing's value.
async fn fill_member_counts(
    gateway: &Arc<dyn Gateway>,
    org: &str,
    records: Vec<TeamRecord>,
    semaphore: &Arc<Semaphore>,
) -> Vec<Team> {
    let mut pending: Vec<(Team, Option<JoinHandle<gateway::Result<TeamRecord>>>)> =
        Vec::with_capacity(records.len());

    for record in &records {
        let team = Team::from(record);
        if team.member_count != 0 {
            pending.push((team, None));
            continue;
        }

        let gateway = Arc::clone(gateway);
        let semaphore = Arc::clone(semaphore);
        let org = org.to_string();
        let slug = team.slug.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| GatewayError::internal("Semaphore closed unexpectedly"))?;
            gateway.get_team_by_slug(&org, &slug).await
        });
        pending.push((team, Some(handle)));
    }

    let mut teams = Vec::with_capacity(pending.len());
    for (team, handle) in pending {
        let Some(handle) = handle else {
            teams.push(team);
            continue;
        };

        match handle.await {
            Ok(Ok(detail)) => teams.push(Team {
                member_count: detail.members_count.unwrap_or(team.member_count),
                ..team
            }),
            Ok(Err(e)) => {
                debug!(org = %org, team = %team.slug, error = %e, "Team lookup failed");
                teams.push(team);
            }
            Err(e) => {
                warn!(org = %org, team = %team.slug, error = %e, "Team lookup task panicked");
                teams.push(team);
            }
        }
    }
    teams
}

/// Fetch repositories and then teams for one organization, emitting the
/// results. Failures are reported as `fetch-error` events, never returned.
pub async fn fetch_all(ctx: &FetchContext, org: &str) {
    match fetch_repo_list(ctx.gateway.as_ref(), &ctx.login, org).await {
        Ok(repos) => ctx.events.emit(SyncEvent::ReposUpdated {
            org: org.to_string(),
            repos,
        }),
        Err(e) => {
            warn!(org = %org, error = %e, "Repository fetch failed");
            ctx.events.emit(SyncEvent::FetchError {
                org: org.to_string(),
                kind: FetchKind::Repos,
                message: short_error_message(&e),
            });
        }
    }

    match fetch_team_list(&ctx.gateway, &ctx.login, org, ctx.team_lookup_concurrency).await {
        Ok(teams) => ctx.events.emit(SyncEvent::TeamsUpdated {
            org: org.to_string(),
            teams,
        }),
        Err(e) => {
            warn!(org = %org, error = %e, "Team fetch failed");
            ctx.events.emit(SyncEvent::FetchError {
                org: org.to_string(),
                kind: FetchKind::Teams,
                message: short_error_message(&e),
            });
        }
    }
}

/// One full fetch pass over `orgs`, in order.
pub async fn fetch_all_orgs(ctx: &FetchContext, orgs: &[String]) {
    let started = Instant::now();
    info!(orgs = orgs.len(), "Starting fetch pass");

    for org in orgs {
        fetch_all(ctx, org).await;
    }

    info!(
        orgs = orgs.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Fetch pass complete"
    );
}
