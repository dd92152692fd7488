//! Builds fresh jobs from prompts.

use chrono::Utc;

use crate::error::{EngineError, Result};
use crate::progress;

use super::model::{Job, JobStatus, Stage};
use super::template::{self, StageTemplate};

/// Creates jobs seeded with a copy of the stage template.
#[derive(Debug, Clone)]
pub struct JobFactory {
    templates: Vec<StageTemplate>,
}

impl JobFactory {
    /// Factory using the canonical seven-stage pipeline.
    pub fn new() -> Self {
        Self {
            templates: template::default_stages(),
        }
    }

    pub fn total_duration(&self) -> f64 {
        template::total_duration(&self.templates)
    }

    /// Builds an idle job for `prompt`. Blank prompts are rejected and no job
    /// is produced; registering the job is up to the caller.
    pub fn create(&self, prompt: &str) -> Result<Job> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(EngineError::InvalidInput(
                "prompt must not be empty".to_string(),
            ));
        }

        let stages: Vec<Stage> = self
            .templates
            .iter()
            .map(|t| Stage::pending(t.name.clone(), t.expected_duration))
            .collect();
        let initial = progress::compute(0.0, self.total_duration());

        Ok(Job {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.to_string(),
            status: JobStatus::Idle,
            progress: initial.percent,
            eta_seconds: initial.eta_seconds,
            stages,
            created_at: Utc::now(),
            outputs: Vec::new(),
            dry_run: false,
            started_at: None,
            finished_at: None,
            error: None,
        })
    }
}

impl Default for JobFactory {
    fn default() -> Self {
        Self::new()
    }
}
