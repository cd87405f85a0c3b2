use ghadmin::{FetchKind, RepoSummary, SyncEvent, Team, parse_full_name};

use crate::commands::{Host, target_org};
use crate::config::Config;
use crate::output;
use crate::{ReposAction, TeamsAction};

/// Result of one on-demand fetch pass for an organization.
#[derive(Debug, Default)]
struct Snapshot {
    repos: Option<Vec<RepoSummary>>,
    teams: Option<Vec<Team>>,
    repo_error: Option<String>,
    team_error: Option<String>,
}

impl Snapshot {
    fn collect(org: &str, events: Vec<SyncEvent>) -> Self {
        let mut snapshot = Self::default();
        for event in events {
            match event {
                SyncEvent::ReposUpdated { org: o, repos } if o == org => {
                    snapshot.repos = Some(repos);
                }
                SyncEvent::TeamsUpdated { org: o, teams } if o == org => {
                    snapshot.teams = Some(teams);
                }
                SyncEvent::FetchError {
                    org: o,
                    kind,
                    message,
                } if o == org => match kind {
                    FetchKind::Repos => snapshot.repo_error = Some(message),
                    FetchKind::Teams => snapshot.team_error = Some(message),
                },
                _ => {}
            }
        }
        snapshot
    }
}

async fn fetch(
    config: &Config,
    org: Option<String>,
) -> Result<(String, Snapshot), Box<dyn std::error::Error>> {
    let (mut host, status) = Host::connected(config, false).await?;
    let org = target_org(org, &status)?;
    host.service.refresh_organization(&org).await;
    let snapshot = Snapshot::collect(&org, host.drain());
    Ok((org, snapshot))
}

pub(crate) async fn handle_repos(
    action: ReposAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ReposAction::List { org, output } => {
            let (org, snapshot) = fetch(config, org).await?;
            if let Some(message) = snapshot.repo_error {
                return Err(format!("Failed to list repositories of {org}: {message}").into());
            }
            let repos = snapshot.repos.unwrap_or_default();
            tracing::debug!(org = %org, count = repos.len(), "Listed repositories");
            output::print_repos(&repos, output)?;
        }
        ReposAction::Show { repo, output } => {
            let (owner, name) = parse_full_name(&repo)
                .ok_or_else(|| format!("Invalid repository '{repo}' (expected owner/repo)"))?;
            let (host, _status) = Host::connected(config, false).await?;
            let detail = host.service.get_repository_detail(owner, name).await?;
            output::print_detail(&detail, output)?;
        }
    }
    Ok(())
}

pub(crate) async fn handle_teams(
    action: TeamsAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TeamsAction::List { org, output } => {
            let (org, snapshot) = fetch(config, org).await?;
            if let Some(message) = snapshot.team_error {
                return Err(format!("Failed to list teams of {org}: {message}").into());
            }
            output::print_teams(&snapshot.teams.unwrap_or_default(), output)?;
        }
    }
    Ok(())
}
