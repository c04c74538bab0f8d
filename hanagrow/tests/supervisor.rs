//! Restart behaviour of the supervisor.

mod common;

use std::time::Duration;

use chrono::{DateTime, Local};
use hanagrow::output::{IterationReport, ProgressSink, RecordingSink};
use hanagrow::scheduler::{RestartPolicy, Supervisor};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

/// Records progress and stops the supervisor after `stop_after` reports.
struct StopAfter {
    inner: RecordingSink,
    stop_after: usize,
    cancel: CancellationToken,
}

impl ProgressSink for StopAfter {
    fn iteration_completed(&self, report: &IterationReport) {
        self.inner.iteration_completed(report);
        if self.inner.reports().len() >= self.stop_after {
            self.cancel.cancel();
        }
    }

    fn batch_completed(&self, finished_at: DateTime<Local>, next_batch_in: Duration) {
        self.inner.batch_completed(finished_at, next_batch_in);
    }

    fn proxy_connected(&self, proxy: &str) {
        self.inner.proxy_connected(proxy);
    }

    fn run_failed(&self, message: &str) {
        self.inner.run_failed(message);
    }
}

async fn flaky_identity_provider() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T1")))
        .with_priority(10)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_restarts_run_after_refresh_failure() {
    let identity = flaky_identity_provider().await;
    let backend = healthy_backend().await;
    let cancel = CancellationToken::new();
    let sink = StopAfter {
        inner: RecordingSink::new(),
        stop_after: 1,
        cancel: cancel.clone(),
    };

    let supervisor = Supervisor::new(app_config(&backend, &identity, 3), cancel)
        .with_restart_policy(RestartPolicy::immediate());
    let stats = supervisor.run(&sink).await;

    assert_eq!(stats.runs, 2);
    assert_eq!(stats.failures, 1);
    let failures = sink.inner.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("503"), "unexpected failure: {}", failures[0]);

    assert_eq!(requests_to(&identity, TOKEN_PATH).await.len(), 2);
    assert_eq!(sink.inner.reports().len(), 1);
}

#[tokio::test]
async fn test_exhausted_auth_restarts_rebuild_the_run() {
    let identity = token_server(&["T1", "T2", "T3"]).await;
    let backend = healthy_backend().await;
    // T1 and T2 are both rejected; the run gives up after one refresh.
    reject_current_user_for(&backend, "T1").await;
    reject_current_user_for(&backend, "T2").await;

    let cancel = CancellationToken::new();
    let sink = StopAfter {
        inner: RecordingSink::new(),
        stop_after: 1,
        cancel: cancel.clone(),
    };
    let mut config = app_config(&backend, &identity, 1);
    config.batch.max_auth_restarts = 1;

    let supervisor =
        Supervisor::new(config, cancel).with_restart_policy(RestartPolicy::immediate());
    let stats = supervisor.run(&sink).await;

    assert_eq!(stats.runs, 2);
    assert_eq!(stats.failures, 1);
    assert!(sink.inner.failures()[0].contains("still unauthorized"));
    // Run 1: initial T1, refresh to T2. Run 2: initial T3.
    assert_eq!(requests_to(&identity, TOKEN_PATH).await.len(), 3);
    assert_eq!(sink.inner.reports().len(), 1);
}

#[tokio::test]
async fn test_cancelled_supervisor_does_not_start() {
    let identity = token_server(&["T1"]).await;
    let backend = healthy_backend().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = Supervisor::new(app_config(&backend, &identity, 1), cancel)
        .run(&RecordingSink::new())
        .await;

    assert_eq!(stats.runs, 0);
    assert!(requests_to(&identity, TOKEN_PATH).await.is_empty());
}

/// Stops the supervisor at the first failed run.
struct StopOnFailure {
    inner: RecordingSink,
    cancel: CancellationToken,
}

impl ProgressSink for StopOnFailure {
    fn iteration_completed(&self, report: &IterationReport) {
        self.inner.iteration_completed(report);
    }

    fn batch_completed(&self, finished_at: DateTime<Local>, next_batch_in: Duration) {
        self.inner.batch_completed(finished_at, next_batch_in);
    }

    fn proxy_connected(&self, proxy: &str) {
        self.inner.proxy_connected(proxy);
    }

    fn run_failed(&self, message: &str) {
        self.inner.run_failed(message);
        self.cancel.cancel();
    }
}

#[tokio::test]
async fn test_proxy_line_is_reported_for_each_run() {
    let identity = token_server(&["T1"]).await;
    let backend = healthy_backend().await;
    let cancel = CancellationToken::new();
    let sink = StopOnFailure {
        inner: RecordingSink::new(),
        cancel: cancel.clone(),
    };
    // Nothing listens on port 9 locally, so the first refresh fails.
    let mut config = app_config(&backend, &identity, 1);
    config.proxy = Some("http://127.0.0.1:9".to_string());

    let stats = Supervisor::new(config, cancel)
        .with_restart_policy(RestartPolicy::immediate())
        .run(&sink)
        .await;

    assert_eq!(stats.runs, 1);
    assert_eq!(stats.failures, 1);
    assert_eq!(sink.inner.proxies(), vec!["http://127.0.0.1:9".to_string()]);
    assert!(requests_to(&identity, TOKEN_PATH).await.is_empty());
}

#[tokio::test]
async fn test_no_proxy_line_without_proxy() {
    let identity = token_server(&["T1"]).await;
    let backend = healthy_backend().await;
    let cancel = CancellationToken::new();
    let sink = StopAfter {
        inner: RecordingSink::new(),
        stop_after: 1,
        cancel: cancel.clone(),
    };

    Supervisor::new(app_config(&backend, &identity, 1), cancel)
        .run(&sink)
        .await;

    assert!(sink.inner.proxies().is_empty());
    assert_eq!(sink.inner.reports().len(), 1);
}
