//! Process driver.
//!
//! Owns the outer loop: open a session, obtain a first access token, run the
//! orchestrator. Whatever error escapes a run is logged and the whole run is
//! rebuilt from scratch after the restart backoff.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::orchestrator::BatchOrchestrator;
use super::restart::{RestartPolicy, RestartTracker};
use crate::config::AppConfig;
use crate::credentials::{CredentialState, SecureTokenCredentialManager};
use crate::error::Result;
use crate::output::ProgressSink;
use crate::session::BackendSession;

/// Counters for the lifetime of a [`Supervisor::run`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Runs started, including the first.
    pub runs: u64,
    /// Runs that ended with an error.
    pub failures: u64,
}

pub struct Supervisor {
    config: AppConfig,
    restart_policy: RestartPolicy,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(config: AppConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            restart_policy: RestartPolicy::default(),
            cancel,
        }
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Keep runs going until the cancellation token fires.
    pub async fn run(&self, sink: &dyn ProgressSink) -> SupervisorStats {
        let mut tracker = RestartTracker::new(self.restart_policy.clone());
        let mut stats = SupervisorStats::default();

        while !self.cancel.is_cancelled() {
            stats.runs += 1;
            info!(run = stats.runs, "Starting run");

            let err = match self.run_once(sink).await {
                Ok(()) => break,
                Err(err) => err,
            };

            stats.failures += 1;
            if err.is_transient() {
                warn!(run = stats.runs, error = %err, "Transient failure; restarting run");
            } else {
                error!(run = stats.runs, error = %err, "Run failed; restarting");
            }
            sink.run_failed(&err.to_string());

            let backoff = tracker.record_failure();
            if backoff.is_zero() {
                continue;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        info!(
            runs = stats.runs,
            failures = stats.failures,
            total_restarts = tracker.total_restarts(),
            "Stopped"
        );
        stats
    }

    /// One run: fresh session, fresh credential state, initial refresh, then
    /// batches until cancelled or an error escapes.
    async fn run_once(&self, sink: &dyn ProgressSink) -> Result<()> {
        let session = BackendSession::open(&self.config.session_options())?;
        if let Some(proxy) = self.config.proxy.as_deref() {
            sink.proxy_connected(proxy);
        }

        let manager = Arc::new(SecureTokenCredentialManager::new(
            session.client().clone(),
            self.config.token_url.clone(),
            self.config.api_key.clone(),
        ));
        let mut credentials = CredentialState::new(manager, self.config.refresh_token.clone());
        credentials.refresh().await?;

        let mut orchestrator = BatchOrchestrator::new(
            &session,
            &mut credentials,
            &self.config.batch,
            sink,
            self.cancel.clone(),
        );
        orchestrator.run().await
    }
}
