//! In-memory [`Gateway`] for engine tests.
//!
//! Every call is recorded as a string key such as `list_all_topics:acme/widgets`.
//! Adding that key to `failures` makes the call fail; adding the operation name
//! to `latency` makes it sleep first.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::model::{
    BranchProtectionRequest, CustomPropertyDefinition, CustomPropertyValue, Ruleset, Visibility,
};

use super::errors::{GatewayError, Result};
use super::types::{
    BranchRecord, Gateway, GatewayConnector, OrgRecord, Page, RepoPermissions, RepoRecord,
    TeamRecord, UserInfo,
};

#[derive(Default)]
pub(crate) struct FakeState {
    pub login: String,
    pub orgs: Vec<String>,
    pub org_repos: HashMap<String, Vec<Vec<RepoRecord>>>,
    pub user_repos: Vec<Vec<RepoRecord>>,
    pub repos: HashMap<String, RepoRecord>,
    pub open_prs: HashMap<String, u64>,
    pub branches: HashMap<String, Vec<Vec<BranchRecord>>>,
    pub protection: HashMap<(String, String), Value>,
    pub topics: HashMap<String, Vec<String>>,
    pub team_pages: HashMap<String, Vec<Vec<TeamRecord>>>,
    pub team_details: HashMap<(String, String), TeamRecord>,
    pub repo_teams: HashMap<String, Vec<TeamRecord>>,
    pub property_values: HashMap<String, Vec<CustomPropertyValue>>,
    pub property_definitions: HashMap<String, Vec<CustomPropertyDefinition>>,
    pub property_writes: Vec<(String, Vec<String>, Vec<CustomPropertyValue>)>,
    pub rulesets: HashMap<String, Vec<Ruleset>>,
    pub ruleset_details: HashMap<(String, i64), Ruleset>,
    pub failures: HashSet<String>,
    pub latency: HashMap<&'static str, Duration>,
    pub calls: Vec<(String, Instant)>,
    pub team_lookups_in_flight: usize,
    pub team_lookups_max_in_flight: usize,
}

impl FakeState {
    pub fn call_keys(&self) -> Vec<String> {
        self.calls.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn calls_to(&self, op: &str) -> Vec<(String, Instant)> {
        self.calls
            .iter()
            .filter(|(key, _)| key.split(':').next() == Some(op))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new(login: &str) -> Arc<Self> {
        let fake = Self::default();
        fake.state().login = login.to_string();
        Arc::new(fake)
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn record(&self, op: &'static str, key: String) -> Result<()> {
        let delay = {
            let mut state = self.state();
            state.calls.push((key.clone(), Instant::now()));
            if state.failures.contains(&key) {
                return Err(GatewayError::api(500, format!("injected failure: {key}")));
            }
            state.latency.get(op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

fn page_of<T: Clone>(pages: Option<&Vec<Vec<T>>>, page: u32) -> Page<T> {
    let Some(pages) = pages else {
        return Page::last(Vec::new());
    };
    let index = page.saturating_sub(1) as usize;
    let items = pages.get(index).cloned().unwrap_or_default();
    let next_page = (index + 1 < pages.len()).then_some(page + 1);
    Page {
        items,
        next_page,
        last_page: u32::try_from(pages.len()).ok(),
    }
}

pub(crate) fn repo_record(full_name: &str) -> RepoRecord {
    let name = full_name.rsplit('/').next().unwrap_or(full_name).to_string();
    RepoRecord {
        name,
        full_name: full_name.to_string(),
        html_url: format!("https://github.com/{full_name}"),
        description: Some(format!("{full_name} description")),
        private: false,
        visibility: Some(Visibility::Public),
        fork: false,
        archived: false,
        default_branch: "main".to_string(),
        topics: Vec::new(),
        stargazers_count: 5,
        watchers_count: 5,
        forks_count: 1,
        permissions: Some(RepoPermissions {
            admin: true,
            pull: true,
            push: true,
            ..Default::default()
        }),
    }
}

pub(crate) fn team_record(slug: &str, members_count: Option<u32>) -> TeamRecord {
    TeamRecord {
        name: slug.to_uppercase(),
        slug: slug.to_string(),
        html_url: format!("https://github.com/orgs/acme/teams/{slug}"),
        members_count,
        permission: None,
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn get_authenticated_user(&self) -> Result<UserInfo> {
        self.record("get_authenticated_user", "get_authenticated_user".into())
            .await?;
        let login = self.state().login.clone();
        Ok(UserInfo { login, name: None })
    }

    async fn list_organizations(&self, page: u32) -> Result<Page<OrgRecord>> {
        self.record("list_organizations", format!("list_organizations:{page}"))
            .await?;
        let orgs = self
            .state()
            .orgs
            .iter()
            .map(|login| OrgRecord {
                login: login.clone(),
            })
            .collect();
        Ok(page_of(Some(&vec![orgs]), page))
    }

    async fn list_repositories_for_org(&self, org: &str, page: u32) -> Result<Page<RepoRecord>> {
        self.record(
            "list_repositories_for_org",
            format!("list_repositories_for_org:{org}:{page}"),
        )
        .await?;
        Ok(page_of(self.state().org_repos.get(org), page))
    }

    async fn list_repositories_for_user(&self, page: u32) -> Result<Page<RepoRecord>> {
        self.record(
            "list_repositories_for_user",
            format!("list_repositories_for_user:{page}"),
        )
        .await?;
        Ok(page_of(Some(&self.state().user_repos), page))
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<RepoRecord> {
        let full = format!("{owner}/{repo}");
        self.record("get_repository", format!("get_repository:{full}"))
            .await?;
        self.state()
            .repos
            .get(&full)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(full))
    }

    async fn search_open_pull_requests(&self, owner: &str, repo: &str) -> Result<u64> {
        let full = format!("{owner}/{repo}");
        self.record(
            "search_open_pull_requests",
            format!("search_open_pull_requests:{full}"),
        )
        .await?;
        Ok(self.state().open_prs.get(&full).copied().unwrap_or(0))
    }

    async fn list_branches(&self, owner: &str, repo: &str, page: u32) -> Result<Page<BranchRecord>> {
        let full = format!("{owner}/{repo}");
        self.record("list_branches", format!("list_branches:{full}:{page}"))
            .await?;
        Ok(page_of(self.state().branches.get(&full), page))
    }

    async fn get_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<Value> {
        let full = format!("{owner}/{repo}");
        self.record(
            "get_branch_protection",
            format!("get_branch_protection:{full}:{branch}"),
        )
        .await?;
        self.state()
            .protection
            .get(&(full, branch.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::not_found(branch.to_string()))
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<Value> {
        let full = format!("{owner}/{repo}");
        self.record(
            "update_branch_protection",
            format!("update_branch_protection:{full}:{branch}"),
        )
        .await?;
        let value =
            serde_json::to_value(request).map_err(|e| GatewayError::internal(e.to_string()))?;
        self.state()
            .protection
            .insert((full, branch.to_string()), value.clone());
        Ok(value)
    }

    async fn remove_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<()> {
        let full = format!("{owner}/{repo}");
        self.record(
            "remove_branch_protection",
            format!("remove_branch_protection:{full}:{branch}"),
        )
        .await?;
        self.state().protection.remove(&(full, branch.to_string()));
        Ok(())
    }

    async fn list_all_topics(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let full = format!("{owner}/{repo}");
        self.record("list_all_topics", format!("list_all_topics:{full}"))
            .await?;
        Ok(self.state().topics.get(&full).cloned().unwrap_or_default())
    }

    async fn replace_all_topics(
        &self,
        owner: &str,
        repo: &str,
        topics: &[String],
    ) -> Result<Vec<String>> {
        let full = format!("{owner}/{repo}");
        self.record("replace_all_topics", format!("replace_all_topics:{full}"))
            .await?;
        self.state().topics.insert(full, topics.to_vec());
        Ok(topics.to_vec())
    }

    async fn list_teams(&self, org: &str, page: u32) -> Result<Page<TeamRecord>> {
        self.record("list_teams", format!("list_teams:{org}:{page}"))
            .await?;
        Ok(page_of(self.state().team_pages.get(org), page))
    }

    async fn get_team_by_slug(&self, org: &str, slug: &str) -> Result<TeamRecord> {
        {
            let mut state = self.state();
            state.team_lookups_in_flight += 1;
            state.team_lookups_max_in_flight = state
                .team_lookups_max_in_flight
                .max(state.team_lookups_in_flight);
        }
        let outcome = self
            .record("get_team_by_slug", format!("get_team_by_slug:{org}/{slug}"))
            .await;
        let mut state = self.state();
        state.team_lookups_in_flight -= 1;
        outcome?;
        state
            .team_details
            .get(&(org.to_string(), slug.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::not_found(slug.to_string()))
    }

    async fn list_repository_teams(&self, owner: &str, repo: &str) -> Result<Vec<TeamRecord>> {
        let full = format!("{owner}/{repo}");
        self.record(
            "list_repository_teams",
            format!("list_repository_teams:{full}"),
        )
        .await?;
        Ok(self.state().repo_teams.get(&full).cloned().unwrap_or_default())
    }

    async fn add_team_repo(
        &self,
        org: &str,
        slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<()> {
        self.record(
            "add_team_repo",
            format!("add_team_repo:{org}/{slug}:{owner}/{repo}:{permission}"),
        )
        .await
    }

    async fn remove_team_repo(
        &self,
        org: &str,
        slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<()> {
        self.record(
            "remove_team_repo",
            format!("remove_team_repo:{org}/{slug}:{owner}/{repo}"),
        )
        .await
    }

    async fn get_all_custom_property_values(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<CustomPropertyValue>> {
        let full = format!("{owner}/{repo}");
        self.record(
            "get_all_custom_property_values",
            format!("get_all_custom_property_values:{full}"),
        )
        .await?;
        Ok(self
            .state()
            .property_values
            .get(&full)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_or_update_custom_property_values(
        &self,
        org: &str,
        repo_names: &[String],
        properties: &[CustomPropertyValue],
    ) -> Result<()> {
        self.record(
            "create_or_update_custom_property_values",
            format!("create_or_update_custom_property_values:{org}"),
        )
        .await?;
        self.state().property_writes.push((
            org.to_string(),
            repo_names.to_vec(),
            properties.to_vec(),
        ));
        Ok(())
    }

    async fn get_all_custom_property_definitions(
        &self,
        org: &str,
    ) -> Result<Vec<CustomPropertyDefinition>> {
        self.record(
            "get_all_custom_property_definitions",
            format!("get_all_custom_property_definitions:{org}"),
        )
        .await?;
        Ok(self
            .state()
            .property_definitions
            .get(org)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_rulesets(&self, owner: &str, repo: &str) -> Result<Vec<Ruleset>> {
        let full = format!("{owner}/{repo}");
        self.record("list_rulesets", format!("list_rulesets:{full}"))
            .await?;
        Ok(self.state().rulesets.get(&full).cloned().unwrap_or_default())
    }

    async fn get_ruleset(&self, owner: &str, repo: &str, id: i64) -> Result<Ruleset> {
        let full = format!("{owner}/{repo}");
        self.record("get_ruleset", format!("get_ruleset:{full}:{id}"))
            .await?;
        self.state()
            .ruleset_details
            .get(&(full, id))
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("ruleset {id}")))
    }

    async fn create_ruleset(&self, owner: &str, repo: &str, ruleset: &Ruleset) -> Result<Ruleset> {
        let full = format!("{owner}/{repo}");
        self.record("create_ruleset", format!("create_ruleset:{full}"))
            .await?;
        let mut created = ruleset.clone();
        let mut state = self.state();
        let rulesets = state.rulesets.entry(full).or_default();
        created.id = Some(rulesets.len() as i64 + 1);
        rulesets.push(created.clone());
        Ok(created)
    }

    async fn update_ruleset(
        &self,
        owner: &str,
        repo: &str,
        id: i64,
        ruleset: &Ruleset,
    ) -> Result<Ruleset> {
        let full = format!("{owner}/{repo}");
        self.record("update_ruleset", format!("update_ruleset:{full}:{id}"))
            .await?;
        let mut updated = ruleset.clone();
        updated.id = Some(id);
        self.state()
            .ruleset_details
            .insert((full, id), updated.clone());
        Ok(updated)
    }

    async fn delete_ruleset(&self, owner: &str, repo: &str, id: i64) -> Result<()> {
        let full = format!("{owner}/{repo}");
        self.record("delete_ruleset", format!("delete_ruleset:{full}:{id}"))
            .await
    }
}

/// Connector handing out one shared fake and remembering the tokens it saw.
pub(crate) struct FakeConnector {
    pub gateway: Arc<FakeGateway>,
    pub tokens: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(gateway: Arc<FakeGateway>) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            tokens: Mutex::new(Vec::new()),
        })
    }
}

impl GatewayConnector for FakeConnector {
    fn connect(&self, token: &str) -> Result<Arc<dyn Gateway>> {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(token.to_string());
        Ok(self.gateway.clone())
    }
}
