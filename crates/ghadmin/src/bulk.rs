//! Bulk mutation dispatch.
//!
//! A bulk call fans one mutation out over a list of `owner/repo` identifiers,
//! one repository at a time, in order. Malformed identifiers are skipped and
//! per-repository failures are logged; neither stops the batch. The outcome
//! of every item is collected in a [`BulkReport`] for callers that want it.

use std::collections::BTreeMap;
use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::gateway::{self, Gateway, short_error_message};
use crate::model::{BranchProtectionRequest, CustomPropertyValue};
use crate::topics::{TopicMode, combine};

/// Split `owner/repo` into its two segments.
///
/// Anything other than exactly two non-empty segments is rejected.
#[must_use]
pub fn parse_full_name(full_name: &str) -> Option<(&str, &str)> {
    let mut parts = full_name.split('/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    (parts.next().is_none() && !owner.is_empty() && !repo.is_empty()).then_some((owner, repo))
}

/// Result of one repository within a bulk call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub repo: String,
    /// Short error message when the mutation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-item outcomes of a bulk call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    /// One entry per well-formed identifier, in request order.
    pub outcomes: Vec<ItemOutcome>,
    /// Identifiers that were not valid and were never sent.
    pub skipped: Vec<String>,
}

impl BulkReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.repo.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    fn record(&mut self, repo: &str, result: gateway::Result<()>, action: &str) {
        let error = match result {
            Ok(()) => None,
            Err(e) => {
                warn!(repo = %repo, action, error = %e, "Bulk item failed");
                Some(short_error_message(&e))
            }
        };
        self.outcomes.push(ItemOutcome {
            repo: repo.to_string(),
            error,
        });
    }

    fn skip(&mut self, full_name: &str) {
        debug!(repo = %full_name, "Skipping malformed repository name");
        self.skipped.push(full_name.to_string());
    }
}

/// Run `op` for each well-formed identifier, sequentially.
async fn for_each_repo<'a, F, Fut>(repos: &'a [String], action: &str, mut op: F) -> BulkReport
where
    F: FnMut(&'a str, &'a str) -> Fut,
    Fut: Future<Output = gateway::Result<()>>,
{
    let mut report = BulkReport::default();
    for full_name in repos {
        let Some((owner, repo)) = parse_full_name(full_name) else {
            report.skip(full_name);
            continue;
        };
        let result = op(owner, repo).await;
        report.record(full_name, result, action);
    }
    report
}

/// Read the current topics, combine them with `requested`, and write the result.
pub async fn update_topics(
    gateway: &dyn Gateway,
    owner: &str,
    repo: &str,
    requested: &[String],
    mode: TopicMode,
) -> gateway::Result<Vec<String>> {
    let current = gateway.list_all_topics(owner, repo).await?;
    let topics = combine(&current, requested, mode);
    gateway.replace_all_topics(owner, repo, &topics).await
}

pub async fn bulk_update_topics(
    gateway: &dyn Gateway,
    repos: &[String],
    requested: &[String],
    mode: TopicMode,
) -> BulkReport {
    for_each_repo(repos, "topics", |owner, repo| async move {
        update_topics(gateway, owner, repo, requested, mode)
            .await
            .map(|_| ())
    })
    .await
}

/// Grant `permission` to a team on one repository, or revoke its access when
/// `remove` is set.
pub async fn update_team_access(
    gateway: &dyn Gateway,
    owner: &str,
    repo: &str,
    org: &str,
    team_slug: &str,
    permission: &str,
    remove: bool,
) -> gateway::Result<()> {
    if remove {
        gateway.remove_team_repo(org, team_slug, owner, repo).await
    } else {
        gateway
            .add_team_repo(org, team_slug, owner, repo, permission)
            .await
    }
}

pub async fn bulk_update_team_access(
    gateway: &dyn Gateway,
    repos: &[String],
    org: &str,
    team_slug: &str,
    permission: &str,
    remove: bool,
) -> BulkReport {
    let action = if remove { "team-revoke" } else { "team-grant" };
    for_each_repo(repos, action, |owner, repo| {
        update_team_access(gateway, owner, repo, org, team_slug, permission, remove)
    })
    .await
}

/// Convert a property map into the API's value list. Booleans are sent as
/// `"true"`/`"false"`; other values pass through.
#[must_use]
pub fn to_property_values(properties: &BTreeMap<String, Value>) -> Vec<CustomPropertyValue> {
    properties
        .iter()
        .map(|(name, value)| CustomPropertyValue {
            property_name: name.clone(),
            value: match value {
                Value::Bool(b) => Value::String(b.to_string()),
                other => other.clone(),
            },
        })
        .collect()
}

/// Set custom property values on one repository of `org`.
pub async fn update_custom_properties(
    gateway: &dyn Gateway,
    org: &str,
    repo: &str,
    properties: &BTreeMap<String, Value>,
) -> gateway::Result<()> {
    let values = to_property_values(properties);
    gateway
        .create_or_update_custom_property_values(org, &[repo.to_string()], &values)
        .await
}

/// Repository segment of `owner/repo`, or a bare repository name as given.
fn property_target(name: &str) -> Option<&str> {
    if name.contains('/') {
        parse_full_name(name).map(|(_, repo)| repo)
    } else {
        (!name.is_empty()).then_some(name)
    }
}

/// Set the same custom property values on many repositories of `org` with a
/// single batch write. Every item shares the outcome of that one call.
pub async fn bulk_update_custom_properties(
    gateway: &dyn Gateway,
    org: &str,
    repos: &[String],
    properties: &BTreeMap<String, Value>,
) -> BulkReport {
    let mut report = BulkReport::default();
    let mut targets = Vec::with_capacity(repos.len());
    let mut names = Vec::with_capacity(repos.len());
    for name in repos {
        match property_target(name) {
            Some(repo) => {
                targets.push(name.as_str());
                names.push(repo.to_string());
            }
            None => report.skip(name),
        }
    }
    if names.is_empty() {
        return report;
    }

    let values = to_property_values(properties);
    let result = gateway
        .create_or_update_custom_property_values(org, &names, &values)
        .await;
    let error = result.err().map(|e| {
        warn!(org = %org, count = names.len(), error = %e, "Custom property batch failed");
        short_error_message(&e)
    });
    report.outcomes = targets
        .into_iter()
        .map(|repo| ItemOutcome {
            repo: repo.to_string(),
            error: error.clone(),
        })
        .collect();
    report
}

/// Apply the same protection to `branch` on every repository.
pub async fn bulk_update_branch_protection(
    gateway: &dyn Gateway,
    repos: &[String],
    branch: &str,
    request: &BranchProtectionRequest,
) -> BulkReport {
    for_each_repo(repos, "branch-protection", |owner, repo| async move {
        gateway
            .update_branch_protection(owner, repo, branch, request)
            .await
            .map(|_| ())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeGateway;
    use serde_json::json;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn full_names_need_exactly_two_segments() {
        assert_eq!(parse_full_name("acme/widgets"), Some(("acme", "widgets")));
        assert_eq!(parse_full_name("acmewidgets"), None);
        assert_eq!(parse_full_name("acme/"), None);
        assert_eq!(parse_full_name("/widgets"), None);
        assert_eq!(parse_full_name("acme/widgets/extra"), None);
        assert_eq!(parse_full_name(""), None);
    }

    #[tokio::test]
    async fn update_topics_reads_then_replaces() {
        let fake = FakeGateway::new("alice");
        fake.state()
            .topics
            .insert("acme/widgets".into(), names(&["rust", "cli"]));

        let topics = update_topics(
            fake.as_ref(),
            "acme",
            "widgets",
            &names(&["cli", "tui"]),
            TopicMode::Add,
        )
        .await
        .expect("update");

        assert_eq!(topics, names(&["rust", "cli", "tui"]));
        assert_eq!(
            fake.state().call_keys(),
            vec!["list_all_topics:acme/widgets", "replace_all_topics:acme/widgets"]
        );
    }

    #[tokio::test]
    async fn bulk_topics_continue_past_a_failed_repository() {
        let fake = FakeGateway::new("alice");
        fake.state()
            .failures
            .insert("list_all_topics:acme/b".into());

        let report = bulk_update_topics(
            fake.as_ref(),
            &names(&["acme/a", "acme/b", "acme/c"]),
            &names(&["infra"]),
            TopicMode::Add,
        )
        .await;

        let state = fake.state();
        assert_eq!(state.topics.get("acme/a"), Some(&names(&["infra"])));
        assert_eq!(state.topics.get("acme/b"), None);
        assert_eq!(state.topics.get("acme/c"), Some(&names(&["infra"])));

        assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["acme/a", "acme/c"]);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].repo, "acme/b");
    }

    #[tokio::test]
    async fn bulk_team_access_skips_malformed_names() {
        let fake = FakeGateway::new("alice");

        let report = bulk_update_team_access(
            fake.as_ref(),
            &names(&["ownerrepo", "owner/repo2"]),
            "acme",
            "core",
            "push",
            false,
        )
        .await;

        assert_eq!(
            fake.state().call_keys(),
            vec!["add_team_repo:acme/core:owner/repo2:push"]
        );
        assert_eq!(report.skipped, names(&["ownerrepo"]));
        assert_eq!(report.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn team_access_revoke_removes() {
        let fake = FakeGateway::new("alice");

        update_team_access(fake.as_ref(), "acme", "widgets", "acme", "core", "", true)
            .await
            .expect("revoke");

        assert_eq!(
            fake.state().call_keys(),
            vec!["remove_team_repo:acme/core:acme/widgets"]
        );
    }

    #[test]
    fn property_booleans_become_strings() {
        let mut props = BTreeMap::new();
        props.insert("archived".to_string(), json!(true));
        props.insert("tier".to_string(), json!("gold"));
        props.insert("owners".to_string(), json!(["a", "b"]));
        props.insert("retired".to_string(), Value::Null);

        let values = to_property_values(&props);
        let by_name: BTreeMap<_, _> = values
            .iter()
            .map(|v| (v.property_name.as_str(), v.value.clone()))
            .collect();

        assert_eq!(by_name["archived"], json!("true"));
        assert_eq!(by_name["tier"], json!("gold"));
        assert_eq!(by_name["owners"], json!(["a", "b"]));
        assert_eq!(by_name["retired"], Value::Null);
    }

    #[tokio::test]
    async fn bulk_properties_use_one_batch_call() {
        let fake = FakeGateway::new("alice");
        let mut props = BTreeMap::new();
        props.insert("tier".to_string(), json!("gold"));

        let report = bulk_update_custom_properties(
            fake.as_ref(),
            "acme",
            &names(&["acme/widgets", "gadgets", "a/b/c", ""]),
            &props,
        )
        .await;

        let state = fake.state();
        assert_eq!(state.calls.len(), 1);
        let (org, repos, values) = &state.property_writes[0];
        assert_eq!(org, "acme");
        assert_eq!(repos, &names(&["widgets", "gadgets"]));
        assert_eq!(values[0].value, json!("gold"));

        assert_eq!(report.skipped, names(&["a/b/c", ""]));
        assert_eq!(
            report.succeeded().collect::<Vec<_>>(),
            vec!["acme/widgets", "gadgets"]
        );
    }

    #[tokio::test]
    async fn bulk_properties_failure_marks_every_item() {
        let fake = FakeGateway::new("alice");
        fake.state()
            .failures
            .insert("create_or_update_custom_property_values:acme".into());

        let report = bulk_update_custom_properties(
            fake.as_ref(),
            "acme",
            &names(&["widgets", "gadgets"]),
            &BTreeMap::new(),
        )
        .await;

        assert_eq!(report.failed().count(), 2);
    }

    #[tokio::test]
    async fn bulk_properties_with_no_valid_names_make_no_call() {
        let fake = FakeGateway::new("alice");

        let report =
            bulk_update_custom_properties(fake.as_ref(), "acme", &names(&["/"]), &BTreeMap::new())
                .await;

        assert!(fake.state().calls.is_empty());
        assert_eq!(report.skipped, names(&["/"]));
    }

    #[tokio::test]
    async fn bulk_protection_applies_one_branch_everywhere() {
        let fake = FakeGateway::new("alice");
        let request = BranchProtectionRequest {
            enforce_admins: Some(true),
            ..Default::default()
        };

        let report = bulk_update_branch_protection(
            fake.as_ref(),
            &names(&["acme/a", "bad", "acme/b"]),
            "main",
            &request,
        )
        .await;

        assert_eq!(
            fake.state().call_keys(),
            vec![
                "update_branch_protection:acme/a:main",
                "update_branch_protection:acme/b:main"
            ]
        );
        assert_eq!(report.succeeded().count(), 2);
        assert_eq!(report.skipped, names(&["bad"]));
    }

    #[test]
    fn report_serializes_camel_case_without_empty_errors() {
        let report = BulkReport {
            outcomes: vec![ItemOutcome {
                repo: "acme/a".into(),
                error: None,
            }],
            skipped: vec!["bad".into()],
        };
        assert_eq!(
            serde_json::to_value(&report).expect("serialize"),
            json!({"outcomes": [{"repo": "acme/a"}], "skipped": ["bad"]})
        );
    }
}
