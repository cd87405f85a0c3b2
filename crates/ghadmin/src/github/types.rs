//! Request and response envelopes specific to the REST endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{CustomPropertyValue, Ruleset};

/// Body of `GET`/`PUT /repos/{owner}/{repo}/topics`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TopicNames {
    pub names: Vec<String>,
}

/// The only part of a search response we read.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchCount {
    pub total_count: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeamRepoPermission<'a> {
    pub permission: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CustomPropertyValuesRequest<'a> {
    pub repository_names: &'a [String],
    pub properties: &'a [CustomPropertyValue],
}

/// Writable subset of a ruleset, as accepted by create and update.
#[derive(Debug, Serialize)]
pub(crate) struct RulesetRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'a str>,
    pub enforcement: &'a str,
    pub bypass_actors: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<&'a Value>,
    pub rules: &'a [Value],
}

impl<'a> From<&'a Ruleset> for RulesetRequest<'a> {
    fn from(ruleset: &'a Ruleset) -> Self {
        Self {
            name: &ruleset.name,
            target: ruleset.target.as_deref(),
            enforcement: &ruleset.enforcement,
            bypass_actors: &ruleset.bypass_actors,
            conditions: ruleset.conditions.as_ref(),
            rules: &ruleset.rules,
        }
    }
}

/// Error body returned by the API on most failures.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}
