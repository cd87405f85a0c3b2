//! REST implementation of [`Gateway`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use urlencoding::encode;

use crate::gateway::{
    BranchRecord, Gateway, GatewayConnector, GatewayError, OrgRecord, Page, RateLimitedTransport,
    RepoRecord, Result, TeamRecord, ThrottlePolicy, UserInfo, collect_pages, parse_link_header,
};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::model::{
    BranchProtectionRequest, CustomPropertyDefinition, CustomPropertyValue, Ruleset,
};
use crate::retry::RetryConfig;
use crate::sync::{DEFAULT_API_URL, DEFAULT_PER_PAGE, EngineOptions};

use super::error::error_for_status;
use super::types::{
    CustomPropertyValuesRequest, RulesetRequest, SearchCount, TeamRepoPermission, TopicNames,
};

const USER_AGENT: &str = "ghadmin";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub REST client speaking through an [`HttpTransport`].
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: String,
    base_url: String,
    per_page: u32,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            token: token.into(),
            base_url: DEFAULT_API_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Point the client at another API root, e.g. a GitHub Enterprise Server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    async fn send(&self, method: HttpMethod, path: &str, body: Option<Vec<u8>>) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(error_for_status(&response, path))
        }
    }

    fn encode_body<B: Serialize>(body: &B) -> Result<Vec<u8>> {
        serde_json::to_vec(body).map_err(|e| GatewayError::internal(format!("JSON encode error: {e}")))
    }

    fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
        serde_json::from_slice(&response.body)
            .map_err(|e| GatewayError::decode(format!("JSON parse error: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(HttpMethod::Get, path, None).await?;
        Self::decode(&response)
    }

    async fn get_page<T: DeserializeOwned>(&self, path: &str) -> Result<Page<T>> {
        let response = self.send(HttpMethod::Get, path, None).await?;
        let pagination = response
            .header("link")
            .map(parse_link_header)
            .unwrap_or_default();
        Ok(Page {
            items: Self::decode(&response)?,
            next_page: pagination.next_page,
            last_page: pagination.last_page,
        })
    }

    async fn send_json<B, T>(&self, method: HttpMethod, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .send(method, path, Some(Self::encode_body(body)?))
            .await?;
        Self::decode(&response)
    }

    /// Send a request whose response body is ignored (204 or an echo we don't need).
    async fn send_discarding<B: Serialize + Sync>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let body = body.map(Self::encode_body).transpose()?;
        self.send(method, path, body).await?;
        Ok(())
    }

    fn repo_path(owner: &str, repo: &str) -> String {
        format!("/repos/{}/{}", encode(owner), encode(repo))
    }
}

#[async_trait]
impl Gateway for GitHubClient {
    async fn get_authenticated_user(&self) -> Result<UserInfo> {
        self.get_json("/user").await
    }

    async fn list_organizations(&self, page: u32) -> Result<Page<OrgRecord>> {
        self.get_page(&format!("/user/orgs?per_page={}&page={page}", self.per_page))
            .await
    }

    async fn list_repositories_for_org(&self, org: &str, page: u32) -> Result<Page<RepoRecord>> {
        self.get_page(&format!(
            "/orgs/{}/repos?sort=full_name&per_page={}&page={page}",
            encode(org),
            self.per_page
        ))
        .await
    }

    async fn list_repositories_for_user(&self, page: u32) -> Result<Page<RepoRecord>> {
        self.get_page(&format!(
            "/user/repos?affiliation=owner&sort=full_name&per_page={}&page={page}",
            self.per_page
        ))
        .await
    }

    async fn get_repository(&self, owner: &str, repo: &str) -> Result<RepoRecord> {
        self.get_json(&Self::repo_path(owner, repo)).await
    }

    async fn search_open_pull_requests(&self, owner: &str, repo: &str) -> Result<u64> {
        let query = format!("repo:{owner}/{repo} type:pr state:open");
        let result: SearchCount = self
            .get_json(&format!("/search/issues?q={}&per_page=1", encode(&query)))
            .await?;
        Ok(result.total_count)
    }

    async fn list_branches(&self, owner: &str, repo: &str, page: u32) -> Result<Page<BranchRecord>> {
        self.get_page(&format!(
            "{}/branches?per_page={}&page={page}",
            Self::repo_path(owner, repo),
            self.per_page
        ))
        .await
    }

    async fn get_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<Value> {
        self.get_json(&format!(
            "{}/branches/{}/protection",
            Self::repo_path(owner, repo),
            encode(branch)
        ))
        .await
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        request: &BranchProtectionRequest,
    ) -> Result<Value> {
        let path = format!(
            "{}/branches/{}/protection",
            Self::repo_path(owner, repo),
            encode(branch)
        );
        self.send_json(HttpMethod::Put, &path, request).await
    }

    async fn remove_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<()> {
        let path = format!(
            "{}/branches/{}/protection",
            Self::repo_path(owner, repo),
            encode(branch)
        );
        self.send_discarding::<()>(HttpMethod::Delete, &path, None)
            .await
    }

    async fn list_all_topics(&self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let topics: TopicNames = self
            .get_json(&format!("{}/topics", Self::repo_path(owner, repo)))
            .await?;
        Ok(topics.names)
    }

    async fn replace_all_topics(
        &self,
        owner: &str,
        repo: &str,
        topics: &[String],
    ) -> Result<Vec<String>> {
        let body = TopicNames {
            names: topics.to_vec(),
        };
        let updated: TopicNames = self
            .send_json(
                HttpMethod::Put,
                &format!("{}/topics", Self::repo_path(owner, repo)),
                &body,
            )
            .await?;
        Ok(updated.names)
    }

    async fn list_teams(&self, org: &str, page: u32) -> Result<Page<TeamRecord>> {
        self.get_page(&format!(
            "/orgs/{}/teams?per_page={}&page={page}",
            encode(org),
            self.per_page
        ))
        .await
    }

    async fn get_team_by_slug(&self, org: &str, slug: &str) -> Result<TeamRecord> {
        self.get_json(&format!("/orgs/{}/teams/{}", encode(org), encode(slug)))
            .await
    }

    async fn list_repository_teams(&self, owner: &str, repo: &str) -> Result<Vec<TeamRecord>> {
        let base = format!("{}/teams", Self::repo_path(owner, repo));
        collect_pages(|page| {
            let path = format!("{base}?per_page={}&page={page}", self.per_page);
            async move { self.get_page(&path).await }
        })
        .await
    }

    async fn add_team_repo(
        &self,
        org: &str,
        slug: &str,
        owner: &str,
        repo: &str,
        permission: &str,
    ) -> Result<()> {
        let path = format!(
            "/orgs/{}/teams/{}/repos/{}/{}",
            encode(org),
            encode(slug),
            encode(owner),
            encode(repo)
        );
        self.send_discarding(HttpMethod::Put, &path, Some(&TeamRepoPermission { permission }))
            .await
    }

    async fn remove_team_repo(
        &self,
        org: &str,
        slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<()> {
        let path = format!(
            "/orgs/{}/teams/{}/repos/{}/{}",
            encode(org),
            encode(slug),
            encode(owner),
            encode(repo)
        );
        self.send_discarding::<()>(HttpMethod::Delete, &path, None)
            .await
    }

    async fn get_all_custom_property_values(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<CustomPropertyValue>> {
        self.get_json(&format!("{}/properties/values", Self::repo_path(owner, repo)))
            .await
    }

    async fn create_or_update_custom_property_values(
        &self,
        org: &str,
        repo_names: &[String],
        properties: &[CustomPropertyValue],
    ) -> Result<()> {
        let body = CustomPropertyValuesRequest {
            repository_names: repo_names,
            properties,
        };
        self.send_discarding(
            HttpMethod::Patch,
            &format!("/orgs/{}/properties/values", encode(org)),
            Some(&body),
        )
        .await
    }

    async fn get_all_custom_property_definitions(
        &self,
        org: &str,
    ) -> Result<Vec<CustomPropertyDefinition>> {
        self.get_json(&format!("/orgs/{}/properties/schema", encode(org)))
            .await
    }

    async fn list_rulesets(&self, owner: &str, repo: &str) -> Result<Vec<Ruleset>> {
        let base = format!("{}/rulesets", Self::repo_path(owner, repo));
        collect_pages(|page| {
            let path = format!("{base}?per_page={}&page={page}", self.per_page);
            async move { self.get_page(&path).await }
        })
        .await
    }

    async fn get_ruleset(&self, owner: &str, repo: &str, id: i64) -> Result<Ruleset> {
        self.get_json(&format!("{}/rulesets/{id}", Self::repo_path(owner, repo)))
            .await
    }

    async fn create_ruleset(&self, owner: &str, repo: &str, ruleset: &Ruleset) -> Result<Ruleset> {
        self.send_json(
            HttpMethod::Post,
            &format!("{}/rulesets", Self::repo_path(owner, repo)),
            &RulesetRequest::from(ruleset),
        )
        .await
    }

    async fn update_ruleset(
        &self,
        owner: &str,
        repo: &str,
        id: i64,
        ruleset: &Ruleset,
    ) -> Result<Ruleset> {
        self.send_json(
            HttpMethod::Put,
            &format!("{}/rulesets/{id}", Self::repo_path(owner, repo)),
            &RulesetRequest::from(ruleset),
        )
        .await
    }

    async fn delete_ruleset(&self, owner: &str, repo: &str, id: i64) -> Result<()> {
        self.send_discarding::<()>(
            HttpMethod::Delete,
            &format!("{}/rulesets/{id}", Self::repo_path(owner, repo)),
            None,
        )
        .await
    }
}

/// Builds rate-limited [`GitHubClient`]s over reqwest.
#[derive(Debug, Clone)]
pub struct GitHubConnector {
    base_url: String,
    per_page: u32,
    requests_per_second: Option<u32>,
    throttle: ThrottlePolicy,
    retry: RetryConfig,
}

impl GitHubConnector {
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            base_url: options.api_url.clone(),
            per_page: options.per_page,
            requests_per_second: options.requests_per_second,
            throttle: options.throttle,
            retry: options.retry.clone(),
        }
    }
}

impl GatewayConnector for GitHubConnector {
    fn connect(&self, token: &str) -> Result<Arc<dyn Gateway>> {
        let transport = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)?;
        let transport = RateLimitedTransport::new(transport, self.requests_per_second)
            .with_policy(self.throttle)
            .with_retry_config(self.retry.clone());

        let client = GitHubClient::new(token, Arc::new(transport))
            .with_base_url(&self.base_url)
            .with_per_page(self.per_page);
        Ok(Arc::new(client))
    }
}
