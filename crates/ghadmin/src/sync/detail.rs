//! Repository detail aggregation.
//!
//! A detail view needs seven calls. Only the first one, the repository
//! itself, is required; every later step degrades to an empty or zero value
//! on failure and the rest still run.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::gateway::{self, BranchRecord, Gateway};
use crate::model::{BranchProtectionDetail, RepoDetail, RepoSummary, RepoTeam, Ruleset};

/// Build the enriched view of `owner/repo`.
///
/// # Errors
///
/// Returns the gateway error when the repository itself cannot be fetched.
pub async fn get_repo_detail(
    gateway: &dyn Gateway,
    owner: &str,
    repo: &str,
) -> gateway::Result<RepoDetail> {
    let record = gateway.get_repository(owner, repo).await?;
    let full_name = format!("{owner}/{repo}");

    let open_pr_count = gateway
        .search_open_pull_requests(owner, repo)
        .await
        .unwrap_or_else(|e| {
            warn!(repo = %full_name, error = %e, "Open pull request search failed");
            0
        });

    let branches = list_all_branches(gateway, owner, repo).await;
    let branch_count = branches.as_ref().map_or(0, |b| b.len() as u64);

    let custom_properties = match gateway.get_all_custom_property_values(owner, repo).await {
        Ok(values) => values
            .into_iter()
            .map(|v| (v.property_name, v.value))
            .collect(),
        Err(e) => {
            warn!(repo = %full_name, error = %e, "Custom property fetch failed");
            BTreeMap::new()
        }
    };

    let teams = match gateway.list_repository_teams(owner, repo).await {
        Ok(teams) => teams.iter().map(RepoTeam::from).collect(),
        Err(e) => {
            warn!(repo = %full_name, error = %e, "Repository team fetch failed");
            Vec::new()
        }
    };

    let mut branch_protection = Vec::new();
    for branch in branches.iter().flatten().filter(|b| b.protected) {
        match gateway.get_branch_protection(owner, repo, &branch.name).await {
            Ok(protection_rules) => branch_protection.push(BranchProtectionDetail {
                branch_name: branch.name.clone(),
                protection_rules,
            }),
            Err(e) => {
                debug!(repo = %full_name, branch = %branch.name, error = %e, "Skipping branch protection");
            }
        }
    }

    let rulesets = list_full_rulesets(gateway, owner, repo).await;

    Ok(RepoDetail {
        summary: RepoSummary::from(&record),
        description: record.description.unwrap_or_default(),
        stars: record.stargazers_count,
        watchers: record.watchers_count,
        fork_count: record.forks_count,
        open_pr_count,
        branch_count,
        custom_properties,
        teams,
        branch_protection,
        rulesets,
    })
}

/// Every branch across all pages.
///
/// `None` when the first page fails. A later page failing keeps what was
/// collected so far.
async fn list_all_branches(
    gateway: &dyn Gateway,
    owner: &str,
    repo: &str,
) -> Option<Vec<BranchRecord>> {
    let mut branches = Vec::new();
    let mut page = 1;

    loop {
        match gateway.list_branches(owner, repo, page).await {
            Ok(fetched) => {
                if page == 1 {
                    branches.reserve(fetched.size_hint(page));
                }
                branches.extend(fetched.items);
                match fetched.next_page {
                    Some(next) if next > page => page = next,
                    _ => break,
                }
            }
            Err(e) if page == 1 => {
                warn!(repo = %format!("{owner}/{repo}"), error = %e, "Branch listing failed");
                return None;
            }
            Err(e) => {
                warn!(
                    repo = %format!("{owner}/{repo}"),
                    page,
                    collected = branches.len(),
                    error = %e,
                    "Branch listing stopped early, keeping partial count"
                );
                break;
            }
        }
    }

    Some(branches)
}

/// Rulesets with their rule bodies, falling back to the summary form per
/// ruleset when its detail lookup fails.
async fn list_full_rulesets(gateway: &dyn Gateway, owner: &str, repo: &str) -> Vec<Ruleset> {
    let summaries = match gateway.list_rulesets(owner, repo).await {
        Ok(summaries) => summaries,
        Err(e) => {
            warn!(repo = %format!("{owner}/{repo}"), error = %e, "Ruleset listing failed");
            return Vec::new();
        }
    };

    let mut rulesets = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let Some(id) = summary.id else {
            rulesets.push(summary);
            continue;
        };
        match gateway.get_ruleset(owner, repo, id).await {
            Ok(full) => rulesets.push(full),
            Err(e) => {
                debug!(ruleset = id, error = %e, "Ruleset detail failed, keeping summary");
                rulesets.push(summary);
            }
        }
    }
    rulesets
}
