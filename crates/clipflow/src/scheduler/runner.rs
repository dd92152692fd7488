use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug_span, info_span, Instrument};

use crate::broadcast::{JobEvent, JobEventBroadcaster};
use crate::error::{EngineError, Result};
use crate::job::{FailureKind, Job, JobFailure, JobId, JobStatus, StageStatus};
use crate::progress;
use crate::store::{JobStore, SettingsStore};

use super::executor::{StageExecutor, StageFailure};
use super::outputs::OutputSynthesizer;
use super::policy::{policy_for, FailurePolicies, FailurePolicy};

/// Slack for comparing accumulated fractional ticks against a budget.
const EPSILON: f64 = 1e-9;

/// Final notification for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub job_id: JobId,
    pub dry_run: bool,
    pub status: JobStatus,
    pub message: String,
}

impl RunOutcome {
    fn completed(job_id: &str, dry_run: bool) -> Self {
        let message = if dry_run {
            "Dry run complete"
        } else {
            "Job finished successfully"
        };
        Self {
            job_id: job_id.to_string(),
            dry_run,
            status: JobStatus::Completed,
            message: message.to_string(),
        }
    }

    fn failed(job_id: &str, dry_run: bool, message: impl Into<String>) -> Self {
        Self {
            job_id: job_id.to_string(),
            dry_run,
            status: JobStatus::Failed,
            message: message.into(),
        }
    }

    fn cancelled(job_id: &str, dry_run: bool) -> Self {
        Self {
            job_id: job_id.to_string(),
            dry_run,
            status: JobStatus::Cancelled,
            message: "Job cancelled".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// Handle to a run executing in the background.
///
/// Dropping the handle detaches the run; it keeps going.
pub struct RunHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Requests cancellation. The run stops at its next tick boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to reach a terminal state.
    pub async fn wait(self) -> Result<RunOutcome> {
        let job_id = self.job_id;
        self.task.await.map_err(|e| EngineError::TaskFailed {
            job_id,
            reason: e.to_string(),
        })
    }
}

/// Scheduler tuning taken from the engine configuration.
#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    pub run_timeout: Option<Duration>,
    pub failure_policies: FailurePolicies,
}

/// Drives jobs through their stages on Tokio tasks.
#[derive(Clone)]
pub struct StageScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    jobs: Arc<JobStore>,
    settings: Arc<SettingsStore>,
    executor: Arc<dyn StageExecutor>,
    outputs: Arc<dyn OutputSynthesizer>,
    events: JobEventBroadcaster,
    options: SchedulerOptions,
    active: Mutex<HashMap<JobId, CancellationToken>>,
}

/// How a stage ended.
enum StageEnd {
    Done,
    Skipped,
    Stopped(RunOutcome),
}

/// Why the run loop was interrupted between ticks.
enum Interrupt {
    Cancelled,
    TimedOut,
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl StageScheduler {
    pub fn new(
        jobs: Arc<JobStore>,
        settings: Arc<SettingsStore>,
        executor: Arc<dyn StageExecutor>,
        outputs: Arc<dyn OutputSynthesizer>,
        events: JobEventBroadcaster,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs,
                settings,
                executor,
                outputs,
                events,
                options,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Claims an idle job and starts running it in the background.
    ///
    /// The `idle → running` transition and the start of the first stage are
    /// one store update, made before this returns. The cancellation token is
    /// registered under the same registry lock, so `cancel` succeeds as soon
    /// as `start` has. A second call for the same job fails with
    /// `AlreadyRunning`. Must be called from within a Tokio runtime.
    pub fn start(&self, job_id: &str, dry_run: bool) -> Result<RunHandle> {
        let cancel = CancellationToken::new();
        {
            let mut active = self.inner.active_runs();
            self.inner.mutate(job_id, |job| {
                job.begin_run(dry_run)?;
                if let Some(first) = job.stages.first_mut() {
                    first.start();
                }
                Ok(())
            })?;
            active.insert(job_id.to_string(), cancel.clone());
        }

        tracing::info!(job_id = %job_id, dry_run, "Run started");

        let inner = Arc::clone(&self.inner);
        let id = job_id.to_string();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let span = info_span!("run", job_id = %id, dry_run);
            let outcome = match inner.drive(&id, dry_run, &token).instrument(span).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "Run aborted");
                    RunOutcome::failed(&id, dry_run, e.to_string())
                }
            };
            inner.active_runs().remove(&id);
            tracing::info!(
                job_id = %id,
                status = %outcome.status,
                "{}",
                outcome.message
            );
            inner.events.send(JobEvent::Finished(outcome.clone()));
            outcome
        });

        Ok(RunHandle {
            job_id: job_id.to_string(),
            cancel,
            task,
        })
    }

    /// Cancels the active run of a job.
    pub fn cancel(&self, job_id: &str) -> Result<()> {
        let active = self.inner.active_runs();
        if let Some(token) = active.get(job_id) {
            token.cancel();
            return Ok(());
        }
        self.inner.jobs.get(job_id)?;
        Err(EngineError::NotRunning(job_id.to_string()))
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.inner.active_runs().contains_key(job_id)
    }

    /// Cancels every active run.
    pub fn cancel_all(&self) {
        for token in self.inner.active_runs().values() {
            token.cancel();
        }
    }
}

impl Inner {
    fn active_runs(&self) -> MutexGuard<'_, HashMap<JobId, CancellationToken>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Active run registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Applies a mutation through the store and publishes the snapshot.
    fn mutate<F>(&self, job_id: &str, f: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let job = self.jobs.update(job_id, f)?;
        self.events.send(JobEvent::Updated(job.clone()));
        Ok(job)
    }

    async fn drive(&self, job_id: &str, dry_run: bool, cancel: &CancellationToken) -> Result<RunOutcome> {
        let job = self.jobs.get(job_id)?;
        let settings = self.settings.get();
        tracing::debug!(
            sub_langs = settings.sub_langs_or_default(),
            slots = settings.slots_or_default(),
            days = settings.days_or_default(),
            "Using settings"
        );

        let total = job.total_duration();
        let deadline = self.options.run_timeout.map(|t| Instant::now() + t);
        let mut completed = 0.0;

        for (index, stage) in job.stages.iter().enumerate() {
            let span = debug_span!("stage", index, name = %stage.name);
            let end = self
                .run_stage(job_id, dry_run, index, total, completed, deadline, cancel)
                .instrument(span)
                .await?;
            match end {
                StageEnd::Done | StageEnd::Skipped => completed += stage.expected_duration,
                StageEnd::Stopped(outcome) => return Ok(outcome),
            }
        }

        let job = self.jobs.get(job_id)?;
        let outputs = self.outputs.synthesize(&job, &settings);
        self.mutate(job_id, |job| {
            job.complete(outputs);
            Ok(())
        })?;

        Ok(RunOutcome::completed(job_id, dry_run))
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stage(
        &self,
        job_id: &str,
        dry_run: bool,
        index: usize,
        total: f64,
        completed: f64,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> Result<StageEnd> {
        let mut job = self.jobs.get(job_id)?;
        if job.stages[index].status == StageStatus::Pending {
            job = self.mutate(job_id, |job| {
                job.stages[index].start();
                Ok(())
            })?;
        }
        let stage = job.stages[index].clone();
        let policy = policy_for(&self.options.failure_policies, &stage.name);
        tracing::debug!("Stage started");

        let mut stage_elapsed = 0.0;
        let mut retries = 0;

        while stage_elapsed < stage.expected_duration - EPSILON {
            let tick = self.executor.tick(&stage, stage_elapsed);
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.interrupt(job_id, dry_run, index, Interrupt::Cancelled).map(StageEnd::Stopped);
                }
                _ = deadline_reached(deadline) => {
                    return self.interrupt(job_id, dry_run, index, Interrupt::TimedOut).map(StageEnd::Stopped);
                }
                result = tick => result,
            };

            let failure = match result {
                Ok(step) if step > 0.0 && step.is_finite() => {
                    stage_elapsed = (stage_elapsed + step).min(stage.expected_duration);
                    let sample = progress::compute(completed + stage_elapsed, total);
                    self.mutate(job_id, |job| {
                        job.apply_progress(sample);
                        Ok(())
                    })?;
                    continue;
                }
                Ok(step) => StageFailure::new(format!("executor made no progress ({})", step)),
                Err(failure) => failure,
            };

            tracing::warn!(error = %failure, ?policy, "Stage tick failed");
            match policy {
                FailurePolicy::Retry { attempts } if retries < attempts => {
                    retries += 1;
                    let entry = format!("Retrying {} (attempt {}/{})", stage.name, retries, attempts);
                    self.mutate(job_id, |job| {
                        job.stages[index].push_log(entry);
                        Ok(())
                    })?;
                }
                FailurePolicy::SkipStage => {
                    let sample = progress::compute(completed + stage.expected_duration, total);
                    self.mutate(job_id, |job| {
                        job.stages[index].skip(&failure.message);
                        job.apply_progress(sample);
                        Ok(())
                    })?;
                    return Ok(StageEnd::Skipped);
                }
                FailurePolicy::Retry { .. } | FailurePolicy::AbortJob => {
                    let name = stage.name.clone();
                    let message = failure.message.clone();
                    self.mutate(job_id, |job| {
                        job.stages[index].fail(&message);
                        job.fail(JobFailure {
                            kind: FailureKind::StageFailed,
                            message: format!("{}: {}", name, message),
                            stage: Some(name.clone()),
                        });
                        Ok(())
                    })?;
                    return Ok(StageEnd::Stopped(RunOutcome::failed(
                        job_id,
                        dry_run,
                        format!("Job failed at {}: {}", stage.name, failure.message),
                    )));
                }
            }
        }

        self.mutate(job_id, |job| {
            job.stages[index].finish();
            Ok(())
        })?;
        tracing::debug!("Stage completed");
        Ok(StageEnd::Done)
    }

    fn interrupt(
        &self,
        job_id: &str,
        dry_run: bool,
        index: usize,
        reason: Interrupt,
    ) -> Result<RunOutcome> {
        match reason {
            Interrupt::Cancelled => {
                self.mutate(job_id, |job| {
                    let stage = &mut job.stages[index];
                    let entry = format!("Cancelled {}", stage.name);
                    stage.push_log(entry);
                    job.cancel();
                    Ok(())
                })?;
                Ok(RunOutcome::cancelled(job_id, dry_run))
            }
            Interrupt::TimedOut => {
                let limit = self.options.run_timeout.unwrap_or_default();
                let message = format!("run exceeded {}s timeout", limit.as_secs_f64());
                self.mutate(job_id, |job| {
                    let stage = &mut job.stages[index];
                    let name = stage.name.clone();
                    stage.fail(&message);
                    job.fail(JobFailure {
                        kind: FailureKind::Timeout,
                        message: message.clone(),
                        stage: Some(name),
                    });
                    Ok(())
                })?;
                Ok(RunOutcome::failed(
                    job_id,
                    dry_run,
                    format!("Job timed out: {}", message),
                ))
            }
        }
    }
}
