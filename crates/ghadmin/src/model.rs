//! Domain records handed to the host and accepted from it.
//!
//! Every type here serializes with camelCase field names, the shape the host
//! consumes in event payloads. Types that are also read from or written to the
//! REST API (`Ruleset`, custom properties, branch protection bodies) keep the
//! API's snake_case names instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Repository visibility as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Internal,
}

impl Visibility {
    /// Fallback for API payloads that omit `visibility` and only carry `private`.
    #[must_use]
    pub fn from_private_flag(private: bool) -> Self {
        if private { Self::Private } else { Self::Public }
    }
}

/// Connection and organization state shared with the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgStatus {
    pub is_connected: bool,
    pub is_polling: bool,
    /// The authenticated login first, then every organization it belongs to.
    pub organizations: Vec<String>,
    /// Empty when nothing is selected.
    pub selected_org: String,
    /// Empty when no default is configured.
    pub default_org: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub name: String,
    /// `owner/repo`.
    pub full_name: String,
    pub url: String,
    pub topics: Vec<String>,
    pub archived: bool,
    pub public: bool,
    pub visibility: Visibility,
    pub is_fork: bool,
    pub default_branch: String,
    /// True when the caller holds admin, maintain or push on the repository.
    pub can_manage: bool,
}

/// A repository enriched with every secondary lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoDetail {
    #[serde(flatten)]
    pub summary: RepoSummary,
    pub description: String,
    pub stars: u64,
    pub watchers: u64,
    pub fork_count: u64,
    pub open_pr_count: u64,
    pub branch_count: u64,
    pub custom_properties: BTreeMap<String, Value>,
    pub teams: Vec<RepoTeam>,
    pub branch_protection: Vec<BranchProtectionDetail>,
    pub rulesets: Vec<Ruleset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    pub slug: String,
    pub url: String,
    pub member_count: u32,
}

/// A team's access level on one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoTeam {
    pub name: String,
    pub slug: String,
    pub permission: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchProtectionDetail {
    pub branch_name: String,
    pub protection_rules: Value,
}

/// A repository ruleset.
///
/// Summaries from the listing endpoint carry no `rules`; the detail endpoint
/// fills them in. Fields the API adds beyond the named ones are kept in
/// `extra` so the host sees the full object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub enforcement: String,
    #[serde(default)]
    pub bypass_actors: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
    #[serde(default)]
    pub rules: Vec<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A custom property value on one repository, in API form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPropertyValue {
    pub property_name: String,
    /// A string, an array of strings, or null to unset.
    pub value: Value,
}

/// An organization-level custom property schema entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPropertyDefinition {
    pub property_name: String,
    pub value_type: String,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default)]
    pub values_editable_by: Option<String>,
}

/// Body of a branch protection update.
///
/// The four leading fields are required by the API and are sent as `null`
/// when unset; the toggles are only sent when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProtectionRequest {
    #[serde(default)]
    pub required_status_checks: Option<RequiredStatusChecks>,
    #[serde(default)]
    pub enforce_admins: Option<bool>,
    #[serde(default)]
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
    #[serde(default)]
    pub restrictions: Option<BranchRestrictions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_linear_history: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_force_pushes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_deletions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_conversation_resolution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_branch: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredStatusChecks {
    pub strict: bool,
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPullRequestReviews {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_stale_reviews: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_code_owner_reviews: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_last_push_approval: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRestrictions {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub apps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn org_status_serializes_camel_case() {
        let status = OrgStatus {
            is_connected: true,
            is_polling: false,
            organizations: vec!["alice".into(), "acme".into()],
            selected_org: "acme".into(),
            default_org: String::new(),
        };
        let value = serde_json::to_value(&status).expect("serialize");
        assert_eq!(
            value,
            json!({
                "isConnected": true,
                "isPolling": false,
                "organizations": ["alice", "acme"],
                "selectedOrg": "acme",
                "defaultOrg": ""
            })
        );
    }

    #[test]
    fn visibility_falls_back_to_private_flag() {
        assert_eq!(Visibility::from_private_flag(true), Visibility::Private);
        assert_eq!(Visibility::from_private_flag(false), Visibility::Public);
        let parsed: Visibility = serde_json::from_value(json!("internal")).expect("parse");
        assert_eq!(parsed, Visibility::Internal);
    }

    #[test]
    fn ruleset_keeps_unknown_fields() {
        let ruleset: Ruleset = serde_json::from_value(json!({
            "id": 42,
            "name": "main guard",
            "target": "branch",
            "enforcement": "active",
            "node_id": "RRS_abc",
            "_links": {"self": {"href": "https://api.github.com/repos/acme/w/rulesets/42"}}
        }))
        .expect("parse ruleset summary");

        assert_eq!(ruleset.id, Some(42));
        assert!(ruleset.rules.is_empty());
        assert_eq!(ruleset.extra.get("node_id"), Some(&json!("RRS_abc")));

        let back = serde_json::to_value(&ruleset).expect("serialize");
        assert_eq!(back["_links"]["self"]["href"], json!("https://api.github.com/repos/acme/w/rulesets/42"));
    }

    #[test]
    fn branch_protection_request_sends_required_nulls() {
        let request = BranchProtectionRequest {
            enforce_admins: Some(true),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value,
            json!({
                "required_status_checks": null,
                "enforce_admins": true,
                "required_pull_request_reviews": null,
                "restrictions": null
            })
        );
    }

    #[test]
    fn repo_detail_flattens_summary() {
        let detail = RepoDetail {
            summary: RepoSummary {
                name: "widgets".into(),
                full_name: "acme/widgets".into(),
                url: "https://github.com/acme/widgets".into(),
                topics: vec![],
                archived: false,
                public: true,
                visibility: Visibility::Public,
                is_fork: false,
                default_branch: "main".into(),
                can_manage: true,
            },
            description: String::new(),
            stars: 1,
            watchers: 1,
            fork_count: 0,
            open_pr_count: 3,
            branch_count: 2,
            custom_properties: BTreeMap::new(),
            teams: vec![],
            branch_protection: vec![],
            rulesets: vec![],
        };
        let value = serde_json::to_value(&detail).expect("serialize");
        assert_eq!(value["fullName"], json!("acme/widgets"));
        assert_eq!(value["openPrCount"], json!(3));
    }
}
