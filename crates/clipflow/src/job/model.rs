//! Job and stage records.
//!
//! These are the values held by the job store, published to subscribers and
//! persisted under the `jobs` key. Field names serialize in camelCase;
//! legacy `steps` / `duration` names are accepted when reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::progress::Progress;

/// Unique job identifier (UUID v4 string).
pub type JobId = String;

/// Status of a single pipeline stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Done,
    Failed,
    Skipped,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "pending"),
            StageStatus::Running => write!(f, "running"),
            StageStatus::Done => write!(f, "done"),
            StageStatus::Failed => write!(f, "failed"),
            StageStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Overall status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One ordered unit of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// Display label, unique within the template.
    pub name: String,
    pub status: StageStatus,
    /// Budgeted simulated time units.
    #[serde(alias = "duration")]
    pub expected_duration: f64,
    /// Append-only event log.
    #[serde(default)]
    pub log: Vec<String>,
}

impl Stage {
    /// Creates a pending stage with an empty log.
    pub fn pending(name: impl Into<String>, expected_duration: f64) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Pending,
            expected_duration,
            log: Vec::new(),
        }
    }

    /// `pending → running`. Returns false if the stage had already started.
    pub(crate) fn start(&mut self) -> bool {
        if self.status != StageStatus::Pending {
            return false;
        }
        self.status = StageStatus::Running;
        self.log.push(format!("Started {}", self.name));
        true
    }

    /// `running → done`.
    pub(crate) fn finish(&mut self) -> bool {
        if self.status != StageStatus::Running {
            return false;
        }
        self.status = StageStatus::Done;
        self.log.push(format!("Completed {}", self.name));
        true
    }

    /// `running → failed`.
    pub(crate) fn fail(&mut self, error: &str) -> bool {
        if self.status != StageStatus::Running {
            return false;
        }
        self.status = StageStatus::Failed;
        self.log.push(format!("Failed {}: {}", self.name, error));
        true
    }

    /// `running → skipped`.
    pub(crate) fn skip(&mut self, error: &str) -> bool {
        if self.status != StageStatus::Running {
            return false;
        }
        self.status = StageStatus::Skipped;
        self.log.push(format!("Skipped {}: {}", self.name, error));
        true
    }

    pub(crate) fn push_log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }
}

/// Result artifact attached to a completed job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Why a job ended in `failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A stage executor reported an error and the policy aborted the job.
    StageFailed,
    /// The run exceeded its configured time bound.
    Timeout,
    /// The process exited while the job was running.
    Interrupted,
}

/// Failure record for a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

/// A unit of work for one prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub prompt: String,
    pub status: JobStatus,
    pub progress: u8,
    pub eta_seconds: u64,
    #[serde(alias = "steps")]
    pub stages: Vec<Stage>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub outputs: Vec<JobOutput>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

impl Job {
    /// Sum of all stage budgets.
    pub fn total_duration(&self) -> f64 {
        self.stages.iter().map(|s| s.expected_duration).sum()
    }

    /// Index and reference of the stage currently running, if any.
    pub fn current_stage(&self) -> Option<(usize, &Stage)> {
        self.stages
            .iter()
            .enumerate()
            .find(|(_, s)| s.status == StageStatus::Running)
    }

    /// Short id used in log lines and listings.
    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(6)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    /// Checks the stage ordering invariant: a prefix of finished stages,
    /// at most one running (or failed) stage, then only pending stages.
    pub fn stages_in_order(&self) -> bool {
        let mut statuses = self.stages.iter().map(|s| s.status).peekable();
        while matches!(
            statuses.peek(),
            Some(StageStatus::Done | StageStatus::Skipped)
        ) {
            statuses.next();
        }
        if matches!(
            statuses.peek(),
            Some(StageStatus::Running | StageStatus::Failed)
        ) {
            statuses.next();
        }
        statuses.all(|s| s == StageStatus::Pending)
    }

    /// `idle → running`; the only allowed entry into a run.
    pub(crate) fn begin_run(&mut self, dry_run: bool) -> Result<(), EngineError> {
        if self.status != JobStatus::Idle {
            return Err(EngineError::AlreadyRunning {
                job_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        self.status = JobStatus::Running;
        self.dry_run = dry_run;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Applies a progress sample. Progress never moves backward and the
    /// ETA never grows while the job runs.
    pub(crate) fn apply_progress(&mut self, progress: Progress) {
        self.progress = self.progress.max(progress.percent);
        self.eta_seconds = self.eta_seconds.min(progress.eta_seconds);
    }

    pub(crate) fn complete(&mut self, outputs: Vec<JobOutput>) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.eta_seconds = 0;
        self.outputs = outputs;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, failure: JobFailure) {
        self.status = JobStatus::Failed;
        self.error = Some(failure);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn cancel(&mut self) {
        self.status = JobStatus::Cancelled;
        self.finished_at = Some(Utc::now());
    }
}
