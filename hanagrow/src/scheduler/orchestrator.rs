//! Batch orchestrator.
//!
//! Drives the fixed grow/spin call sequence for `iteration_count` iterations,
//! then sleeps for the batch delay and starts over, forever or until
//! cancelled.
//!
//! Each iteration is a small state machine:
//!
//! ```text
//! Probe -> IssueGrow -> CommitGrow -> BaselineUser -> CommitSpin -> LatestUser -> Sleeping
//!   \__________\____________\______________\______________\_____________\
//!                              AuthExpired -> Refreshing -> Probe (same index)
//! ```
//!
//! An expired token anywhere discards the iteration's progress and restarts it
//! from the probe with the refreshed token; the index is not advanced.
//! Failures of the mutating steps are logged and the iteration carries on. A
//! failed or incomplete `CurrentUser` read ends the iteration without a report.

use std::time::Duration;

use chrono::Local;
use hanafuda_api::{CallFailure, CallResult, CurrentUser, Operation};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::credentials::CredentialState;
use crate::error::{Error, Result};
use crate::output::{IterationReport, ProgressSink};
use crate::session::RemoteExecutor;

/// One remote call of an iteration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Cheap read used to surface an expired token before any mutation.
    Probe,
    IssueGrow,
    CommitGrow,
    /// `CurrentUser` before the spin: name and starting points.
    BaselineUser,
    CommitSpin,
    /// `CurrentUser` after the spin: reported points.
    LatestUser,
}

impl Step {
    pub const FIRST: Step = Step::Probe;

    pub fn operation(self) -> Operation {
        match self {
            Self::Probe => Operation::TopStatusSnapshots,
            Self::IssueGrow => Operation::IssueGrowAction,
            Self::CommitGrow => Operation::CommitGrowAction,
            Self::BaselineUser | Self::LatestUser => Operation::CurrentUser,
            Self::CommitSpin => Operation::CommitSpinAction,
        }
    }

    pub fn next(self) -> Option<Step> {
        match self {
            Self::Probe => Some(Self::IssueGrow),
            Self::IssueGrow => Some(Self::CommitGrow),
            Self::CommitGrow => Some(Self::BaselineUser),
            Self::BaselineUser => Some(Self::CommitSpin),
            Self::CommitSpin => Some(Self::LatestUser),
            Self::LatestUser => None,
        }
    }

    /// 1-based position in the sequence.
    pub fn number(self) -> u8 {
        match self {
            Self::Probe => 1,
            Self::IssueGrow => 2,
            Self::CommitGrow => 3,
            Self::BaselineUser => 4,
            Self::CommitSpin => 5,
            Self::LatestUser => 6,
        }
    }

    fn reads_user(self) -> bool {
        matches!(self, Self::BaselineUser | Self::LatestUser)
    }
}

/// How an iteration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    Reported(IterationReport),
    /// Completed without a report (missing `CurrentUser` data).
    Skipped { reason: String },
    Cancelled,
}

/// Counters for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub reported: u32,
    pub skipped: u32,
    /// Iterations restarted because the access token expired.
    pub auth_restarts: u32,
    pub cancelled: bool,
}

enum State {
    Step(Step),
    Refreshing,
    Sleeping(IterationOutcome),
}

/// Data collected while walking one iteration.
#[derive(Default)]
struct Progress {
    baseline: Option<CurrentUser>,
    latest: Option<CurrentUser>,
    degraded_steps: Vec<Step>,
}

pub struct BatchOrchestrator<'a> {
    executor: &'a dyn RemoteExecutor,
    credentials: &'a mut CredentialState,
    config: &'a BatchConfig,
    sink: &'a dyn ProgressSink,
    cancel: CancellationToken,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(
        executor: &'a dyn RemoteExecutor,
        credentials: &'a mut CredentialState,
        config: &'a BatchConfig,
        sink: &'a dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            credentials,
            config,
            sink,
            cancel,
        }
    }

    /// Run batches back to back until cancelled or an error escapes.
    pub async fn run(&mut self) -> Result<()> {
        let mut batch = 0u64;
        loop {
            batch += 1;
            info!(batch, iterations = self.config.iteration_count.get(), "Starting batch");

            let summary = self.run_batch().await?;
            if summary.cancelled {
                info!(batch, "Batch cancelled");
                return Ok(());
            }

            info!(
                batch,
                reported = summary.reported,
                skipped = summary.skipped,
                auth_restarts = summary.auth_restarts,
                "Batch complete"
            );
            self.sink
                .batch_completed(Local::now(), self.config.batch_delay);

            if !self.pause(self.config.batch_delay).await {
                return Ok(());
            }
        }
    }

    /// Run a single batch of `iteration_count` iterations.
    pub async fn run_batch(&mut self) -> Result<BatchSummary> {
        let total = self.config.iteration_count.get();
        let mut summary = BatchSummary::default();

        for index in 1..=total {
            let (outcome, restarts) = self.run_iteration(index).await?;
            summary.auth_restarts += restarts;

            match outcome {
                IterationOutcome::Reported(_) => summary.reported += 1,
                IterationOutcome::Skipped { reason } => {
                    warn!(index, total, %reason, "Iteration finished without a report");
                    summary.skipped += 1;
                }
                IterationOutcome::Cancelled => {
                    summary.cancelled = true;
                    return Ok(summary);
                }
            }
        }

        Ok(summary)
    }

    /// Run iteration `index` to completion.
    ///
    /// Returns the outcome and the number of token refreshes it took.
    pub async fn run_iteration(&mut self, index: u32) -> Result<(IterationOutcome, u32)> {
        let total = self.config.iteration_count.get();
        let mut auth_restarts = 0u32;
        let mut progress = Progress::default();
        let mut state = State::Step(Step::FIRST);

        loop {
            state = match state {
                State::Step(step) => {
                    if self.cancel.is_cancelled() {
                        return Ok((IterationOutcome::Cancelled, auth_restarts));
                    }
                    self.run_step(index, step, &mut progress).await?
                }
                State::Refreshing => {
                    auth_restarts += 1;
                    if auth_restarts > self.config.max_auth_restarts {
                        return Err(Error::AuthRetriesExhausted {
                            index,
                            attempts: self.config.max_auth_restarts,
                        });
                    }
                    info!(index, attempt = auth_restarts, "Access token expired, refreshing token...");
                    self.credentials.refresh().await?;
                    progress = Progress::default();
                    State::Step(Step::FIRST)
                }
                State::Sleeping(outcome) => {
                    if let IterationOutcome::Reported(report) = &outcome {
                        self.sink.iteration_completed(report);
                    }
                    let outcome = if self.pause(self.config.call_delay).await {
                        outcome
                    } else {
                        IterationOutcome::Cancelled
                    };
                    debug!(index, total, "Iteration finished");
                    return Ok((outcome, auth_restarts));
                }
            };
        }
    }

    async fn run_step(&mut self, index: u32, step: Step, progress: &mut Progress) -> Result<State> {
        let token = self.credentials.ensure_access_token().await?.clone();
        let operation = step.operation();
        debug!(index, step = step.number(), %operation, "Executing step");

        let result = self.executor.execute(operation, &token).await?;
        let body = match result {
            CallResult::AuthExpired => {
                debug!(index, step = step.number(), %operation, "Access token rejected");
                return Ok(State::Refreshing);
            }
            CallResult::OtherError(failure) => {
                return Ok(self.on_failure(index, step, failure, progress));
            }
            CallResult::Success(body) => body,
        };

        if step.reads_user() {
            match CurrentUser::from_response(&body) {
                Some(user) if step == Step::BaselineUser => progress.baseline = Some(user),
                Some(user) => progress.latest = Some(user),
                None => {
                    return Ok(State::Sleeping(IterationOutcome::Skipped {
                        reason: format!(
                            "step {} ({operation}) returned no name/totalPoint: {}",
                            step.number(),
                            summarize(&body)
                        ),
                    }));
                }
            }
        }

        match step.next() {
            Some(next) => Ok(State::Step(next)),
            None => Ok(State::Sleeping(self.finish(index, progress))),
        }
    }

    fn on_failure(&self, index: u32, step: Step, failure: CallFailure, progress: &mut Progress) -> State {
        let operation = step.operation();
        if step.reads_user() {
            return State::Sleeping(IterationOutcome::Skipped {
                reason: format!("step {} ({operation}) failed: {failure}", step.number()),
            });
        }

        warn!(
            index,
            step = step.number(),
            %operation,
            %failure,
            "Remote call failed; continuing iteration"
        );
        progress.degraded_steps.push(step);
        match step.next() {
            Some(next) => State::Step(next),
            None => State::Sleeping(self.finish(index, progress)),
        }
    }

    fn finish(&self, index: u32, progress: &Progress) -> IterationOutcome {
        let (Some(baseline), Some(latest)) = (&progress.baseline, &progress.latest) else {
            return IterationOutcome::Skipped {
                reason: "CurrentUser data missing".to_string(),
            };
        };

        if !progress.degraded_steps.is_empty() {
            debug!(index, degraded = ?progress.degraded_steps, "Iteration completed with failed steps");
        }
        debug!(
            index,
            gained = points_gained(baseline, latest),
            "Spin reward"
        );

        IterationOutcome::Reported(IterationReport {
            index,
            total: self.config.iteration_count.get(),
            user_name: baseline.name.clone(),
            total_points: latest.total_point,
        })
    }

    /// Sleep for `duration`; returns `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

/// Points earned between two `CurrentUser` reads.
fn points_gained(baseline: &CurrentUser, latest: &CurrentUser) -> i64 {
    latest.total_point.saturating_sub(baseline.total_point)
}

fn summarize(body: &Value) -> String {
    let mut rendered = body.to_string();
    if rendered.len() > 200 {
        let mut end = 200;
        while !rendered.is_char_boundary(end) {
            end -= 1;
        }
        rendered.truncate(end);
        rendered.push_str("...");
    }
    rendered
}
