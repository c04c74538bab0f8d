//! Batch runs against mock HTTP servers, through the real session and
//! identity provider client.

mod common;

use std::sync::Arc;

use hanagrow::credentials::{CredentialState, SecureTokenCredentialManager};
use hanagrow::output::RecordingSink;
use hanagrow::scheduler::BatchOrchestrator;
use hanagrow::session::BackendSession;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

struct Fixture {
    session: BackendSession,
    credentials: CredentialState,
    config: hanagrow::config::AppConfig,
}

impl Fixture {
    fn new(backend: &MockServer, identity: &MockServer, iterations: u32) -> Self {
        let config = app_config(backend, identity, iterations);
        let session = BackendSession::open(&config.session_options()).unwrap();
        let manager = SecureTokenCredentialManager::new(
            session.client().clone(),
            config.token_url.clone(),
            config.api_key.clone(),
        );
        let credentials = CredentialState::new(Arc::new(manager), config.refresh_token.clone());
        Self {
            session,
            credentials,
            config,
        }
    }

    async fn run_batch(&mut self, sink: &RecordingSink) -> hanagrow::Result<hanagrow::scheduler::BatchSummary> {
        let mut orchestrator = BatchOrchestrator::new(
            &self.session,
            &mut self.credentials,
            &self.config.batch,
            sink,
            CancellationToken::new(),
        );
        orchestrator.run_batch().await
    }
}

#[tokio::test]
async fn test_expired_token_on_current_user_refreshes_and_restarts_iteration() {
    let identity = token_server(&["T1", "T2"]).await;
    let backend = healthy_backend().await;
    reject_current_user_for(&backend, "T1").await;

    let mut fixture = Fixture::new(&backend, &identity, 1);
    let sink = RecordingSink::new();
    let summary = fixture.run_batch(&sink).await.unwrap();

    assert_eq!(summary.reported, 1);
    assert_eq!(summary.auth_restarts, 1);

    assert_eq!(requests_to(&identity, TOKEN_PATH).await.len(), 2);

    let calls = requests_to(&backend, GRAPHQL_PATH).await;
    assert_eq!(calls.len(), 4 + 6);
    let bearer = |r: &wiremock::Request| {
        r.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    assert!(calls[..4].iter().all(|r| bearer(r).as_deref() == Some("Bearer T1")));
    assert!(calls[4..].iter().all(|r| bearer(r).as_deref() == Some("Bearer T2")));
    // The restarted iteration begins with the probe.
    assert!(String::from_utf8_lossy(&calls[4].body).contains("getTopStatusSnapshots"));

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].index, 1);
    assert_eq!(reports[0].total, 1);
    assert_eq!(reports[0].user_name, "alice");
    assert_eq!(reports[0].total_points, 4200);
}

#[tokio::test]
async fn test_unauthorized_payload_is_treated_as_expired_token() {
    let identity = token_server(&["T1", "T2"]).await;
    let backend = healthy_backend().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(wiremock::matchers::header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "UNAUTHORIZED: token expired"}],
        })))
        .with_priority(1)
        .mount(&backend)
        .await;

    let mut fixture = Fixture::new(&backend, &identity, 2);
    let sink = RecordingSink::new();
    let summary = fixture.run_batch(&sink).await.unwrap();

    assert_eq!(summary.reported, 2);
    assert_eq!(
        sink.reports().iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 2]
    );
    // Rejected probe, then two full iterations.
    assert_eq!(requests_to(&backend, GRAPHQL_PATH).await.len(), 1 + 12);
}

#[tokio::test]
async fn test_spin_server_error_still_reports_every_iteration() {
    let identity = token_server(&["T1"]).await;
    let backend = healthy_backend().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("commitSpinAction"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "errors": [{"message": "Internal server error"}],
        })))
        .with_priority(1)
        .mount(&backend)
        .await;

    let mut fixture = Fixture::new(&backend, &identity, 3);
    let sink = RecordingSink::new();
    let summary = fixture.run_batch(&sink).await.unwrap();

    assert_eq!(summary.reported, 3);
    assert_eq!(summary.auth_restarts, 0);
    assert_eq!(sink.reports().len(), 3);
    assert_eq!(requests_to(&identity, TOKEN_PATH).await.len(), 1);
}

#[tokio::test]
async fn test_html_error_page_on_current_user_skips_report() {
    let identity = token_server(&["T1"]).await;
    let backend = healthy_backend().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_string_contains("currentUser"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&backend)
        .await;

    let mut fixture = Fixture::new(&backend, &identity, 2);
    let sink = RecordingSink::new();
    let summary = fixture.run_batch(&sink).await.unwrap();

    assert_eq!(summary.reported, 1);
    assert_eq!(summary.skipped, 1);
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].index, 2);
}

#[tokio::test]
async fn test_provider_rejection_fails_the_batch() {
    let identity = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "INVALID_REFRESH_TOKEN", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&identity)
        .await;
    let backend = healthy_backend().await;

    let mut fixture = Fixture::new(&backend, &identity, 1);
    let sink = RecordingSink::new();
    let err = fixture.run_batch(&sink).await.unwrap_err();

    assert!(err.is_credential_failure());
    assert!(err.to_string().contains("INVALID_REFRESH_TOKEN"));
    assert!(requests_to(&backend, GRAPHQL_PATH).await.is_empty());
}
