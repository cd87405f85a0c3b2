use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::model::{
    BranchProtectionRequest, CustomPropertyDefinition, CustomPropertyValue, Ruleset, Visibility,
};

use super::errors::Result;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Page number to request next; `None` on the final page.
    pub next_page: Option<u32>,
    /// Last page number when the server advertised it.
    pub last_page: Option<u32>,
}

impl<T> Page<T> {
    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
            last_page: None,
        }
    }

    /// Items expected from page `page` through the advertised last page,
    /// assuming every remaining page is as full as this one.
    pub fn size_hint(&self, page: u32) -> usize {
        let remaining = self
            .last_page
            .map_or(0, |last| last.saturating_sub(page) as usize);
        self.items.len().saturating_mul(remaining + 1)
    }
}

/// Information about the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrgRecord {
    pub login: String,
}

/// The caller's permission bits on a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepoPermissions {
    pub admin: bool,
    pub maintain: bool,
    pub push: bool,
    pub triage: bool,
    pub pull: bool,
}

impl RepoPermissions {
    #[must_use]
    pub fn can_manage(&self) -> bool {
        self.admin || self.maintain || self.push
    }
}

/// A repository as returned by listing and lookup endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoRecord {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub permissions: Option<RepoPermissions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub html_url: String,
    /// Only present on single-team lookups.
    #[serde(default)]
    pub members_count: Option<u32>,
    /// Only present on repository team listings.
    #[serde(default)]
    pub permission: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchRecord {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

/// Capability interface over the remote administration API.
///
/// Every call is expected to absorb throttling internally; an error returned
/// here is final for that call. Paginated methods take a 1-based page number
/// and report the next one in [`Page::next_page`].
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get_authenticated_user(&self) -> Result<UserInfo>;

    async fn list_organizations(&self, page: u32) -> Result<Page<OrgRecord>>;

    async fn list_repositories_for_org(&self, org: &str, page: u32) -> Result<Page<RepoRecord>>;

    /// Repositories owned by the authenticated user.
    async fn list_repositories_for_user(&self, page: u32) -> Result<Page<RepoRecord>>;

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<RepoRecord>;

    /// Total count of open pull requests, from a one-item search.
    async fn search_open_pull_requests(&self, owner: &str, repo: &str) -> Result<u64>;

    async fn list_branches(&self, owner: &str, repo: &str, page: u32) -> Result<Page<BranchRecord>>;

    async fn get_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<Value>;

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<Value>;

    async fn remove_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<()>;

    async fn list_all_topics(&self, owner: &str, repo: &str) -> Result<Vec<String>>;

    async fn replace_all_topics(
        &self,
        owner: &str,
        repo: &str,
        topics: &[String],
    ) -> Result<Vec<String>>;

    async fn list_teams(&self, org: &str, page: u32) -> Result<Page<TeamRecord>>;

    async fn get_team_by_slug(&self, org: &str, slug: &str) -> Result<TeamRecord>;

    /// Teams with access to a repository, with their permission.
    async fn list_repository_teams(&self, owner: &str, repo: &str) -> Result<Vec<TeamRecord>>;

    async fn add_team_repo(
        &self,
        org: &str,
        slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<()>;

    async fn remove_team_repo(&self, org: &str, slug: &str, owner: &str, repo: &str)
    -> Result<()>;

    async fn get_all_custom_property_values(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<CustomPropertyValue>>;

    /// Org-level batch write of the same values to many repositories.
    async fn create_or_update_custom_property_values(
        &self,
        org: &str,
        repo_names: &[String],
        properties: &[CustomPropertyValue],
    ) -> Result<()>;

    async fn get_all_custom_property_definitions(
        &self,
        org: &str,
    ) -> Result<Vec<CustomPropertyDefinition>>;

    async fn list_rulesets(&self, owner: &str, repo: &str) -> Result<Vec<Ruleset>>;

    async fn get_ruleset(&self, owner: &str, repo: &str, id: i64) -> Result<Ruleset>;

    async fn create_ruleset(&self, owner: &str, repo: &str, ruleset: &Ruleset) -> Result<Ruleset>;

    async fn update_ruleset(
        &self,
        owner: &str,
        repo: &str,
        id: i64,
        ruleset: &Ruleset,
    ) -> Result<Ruleset>;

    async fn delete_ruleset(&self, owner: &str, repo: &str, id: i64) -> Result<()>;
}

/// Builds a [`Gateway`] for a token.
///
/// Building does not contact the server; the session verifies the token with
/// [`Gateway::get_authenticated_user`] afterwards.
pub trait GatewayConnector: Send + Sync {
    fn connect(&self, token: &str) -> Result<Arc<dyn Gateway>>;
}
