//! End-to-end tests of the service over the REST client.
//!
//! A canned transport answers by method and path, so these tests cover the
//! whole stack from `AdminService` down to the wire format.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ghadmin::gateway::{self, Gateway, GatewayConnector};
use ghadmin::http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use ghadmin::{
    AdminError, AdminService, EngineOptions, EventSink, GitHubClient, MemoryConfigStore, Settings,
    Visibility,
};
use serde_json::{Value, json};

const BASE: &str = "https://api.test";

#[derive(Default)]
struct CannedTransport {
    routes: Mutex<HashMap<(HttpMethod, String), (u16, Value)>>,
    requests: Mutex<Vec<(HttpMethod, String)>>,
}

impl CannedTransport {
    fn route(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .expect("routes")
            .insert((method, path.to_string()), (status, body));
    }

    fn requests(&self) -> Vec<(HttpMethod, String)> {
        self.requests.lock().expect("requests").clone()
    }
}

#[async_trait]
impl HttpTransport for CannedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let path = request
            .url
            .strip_prefix(BASE)
            .unwrap_or(&request.url)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        self.requests
            .lock()
            .expect("requests")
            .push((request.method, path.clone()));

        let (status, body) = self
            .routes
            .lock()
            .expect("routes")
            .get(&(request.method, path))
            .cloned()
            .unwrap_or((404, json!({"message": "Not Found"})));
        let body = if body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&body).expect("encode body")
        };
        Ok(HttpResponse {
            status,
            headers: vec![("content-type".into(), "application/json".into())],
            body,
        })
    }
}

struct CannedConnector {
    transport: Arc<CannedTransport>,
}

impl GatewayConnector for CannedConnector {
    fn connect(&self, token: &str) -> gateway::Result<Arc<dyn Gateway>> {
        let transport: Arc<dyn HttpTransport> = self.transport.clone();
        Ok(Arc::new(
            GitHubClient::new(token, transport).with_base_url(BASE),
        ))
    }
}

fn service(transport: &Arc<CannedTransport>, settings: Settings) -> (AdminService, Arc<MemoryConfigStore>) {
    let store = Arc::new(MemoryConfigStore::new(settings));
    let options = EngineOptions {
        poll_on_connect: false,
        api_url: BASE.to_string(),
        ..Default::default()
    };
    let service = AdminService::new(
        Arc::new(CannedConnector {
            transport: Arc::clone(transport),
        }),
        store.clone(),
        EventSink::noop(),
        options,
    );
    (service, store)
}

fn signed_in() -> Arc<CannedTransport> {
    let transport = Arc::new(CannedTransport::default());
    transport.route(HttpMethod::Get, "/user", 200, json!({"login": "alice"}));
    transport.route(
        HttpMethod::Get,
        "/user/orgs",
        200,
        json!([{"login": "orgA"}, {"login": "orgB"}]),
    );
    transport
}

#[tokio::test]
async fn connect_selects_configured_default() {
    let transport = signed_in();
    let (service, store) = service(
        &transport,
        Settings {
            default_org: Some("orgA".into()),
            ..Default::default()
        },
    );

    let status = service.connect("ghp_token").await.expect("connect");

    assert_eq!(status.organizations, vec!["alice", "orgA", "orgB"]);
    assert_eq!(status.selected_org, "orgA");
    assert_eq!(store.snapshot().selected_org.as_deref(), Some("orgA"));
}

#[tokio::test]
async fn rejected_token_is_an_auth_error() {
    let transport = Arc::new(CannedTransport::default());
    transport.route(
        HttpMethod::Get,
        "/user",
        401,
        json!({"message": "Bad credentials"}),
    );
    let (service, store) = service(&transport, Settings::default());

    let err = service.connect("bad").await.expect_err("rejected");

    assert!(matches!(err, AdminError::Auth(_)));
    assert!(!service.status().is_connected);
    assert_eq!(store.snapshot().token, None);
}

#[tokio::test]
async fn bulk_team_grant_skips_malformed_names() {
    let transport = signed_in();
    transport.route(
        HttpMethod::Put,
        "/orgs/acme/teams/core/repos/owner/repo2",
        204,
        Value::Null,
    );
    let (service, _store) = service(&transport, Settings::default());
    service.connect("ghp_token").await.expect("connect");

    let report = service
        .bulk_update_team_access(
            &["ownerrepo".to_string(), "owner/repo2".to_string()],
            "acme",
            "core",
            "push",
            false,
        )
        .await
        .expect("bulk call");

    let writes: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|(method, _)| *method != HttpMethod::Get)
        .collect();
    assert_eq!(
        writes,
        vec![(
            HttpMethod::Put,
            "/orgs/acme/teams/core/repos/owner/repo2".to_string()
        )]
    );
    assert_eq!(report.skipped, vec!["ownerrepo"]);
    assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["owner/repo2"]);
}

#[tokio::test]
async fn detail_degrades_when_only_the_repository_resolves() {
    let transport = signed_in();
    transport.route(
        HttpMethod::Get,
        "/repos/acme/widgets",
        200,
        json!({
            "name": "widgets",
            "full_name": "acme/widgets",
            "html_url": "https://github.com/acme/widgets",
            "description": "Widget factory",
            "private": false,
            "visibility": "internal",
            "default_branch": "main",
            "topics": ["rust"],
            "stargazers_count": 12,
            "watchers_count": 12,
            "forks_count": 2,
            "permissions": {"admin": false, "maintain": false, "push": true, "triage": true, "pull": true}
        }),
    );
    let (service, _store) = service(&transport, Settings::default());
    service.connect("ghp_token").await.expect("connect");

    let detail = service
        .get_repository_detail("acme", "widgets")
        .await
        .expect("detail");

    assert_eq!(detail.summary.visibility, Visibility::Internal);
    assert!(detail.summary.can_manage);
    assert_eq!(detail.description, "Widget factory");
    assert_eq!(detail.stars, 12);
    assert_eq!(detail.open_pr_count, 0);
    assert_eq!(detail.branch_count, 0);
    assert!(detail.custom_properties.is_empty());
    assert!(detail.teams.is_empty());
    assert!(detail.branch_protection.is_empty());
    assert!(detail.rulesets.is_empty());
}

#[tokio::test]
async fn missing_repository_fails_the_detail_call() {
    let transport = signed_in();
    let (service, _store) = service(&transport, Settings::default());
    service.connect("ghp_token").await.expect("connect");

    let err = service
        .get_repository_detail("acme", "ghost")
        .await
        .expect_err("not found");

    assert!(matches!(err, AdminError::Gateway(e) if e.is_not_found()));
}
