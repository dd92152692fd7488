//! Job submission and inspection commands.

use anyhow::{bail, Context};
use chrono::Local;
use clipflow::{Job, JobStatus};
use serde::Serialize;

use super::print_json;
use crate::events;
use crate::state::AppState;

/// Summary row for `list`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub prompt: String,
    pub status: JobStatus,
    pub progress: u8,
    pub eta_seconds: u64,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            prompt: job.prompt.clone(),
            status: job.status,
            progress: job.progress,
            eta_seconds: job.eta_seconds,
        }
    }
}

/// Submits `prompt`, runs it and streams progress until it finishes.
/// Ctrl-C cancels the run.
pub async fn run(state: &AppState, prompt: &str, dry_run: bool) -> anyhow::Result<()> {
    let engine = &state.engine;
    let mut rx = engine.subscribe();
    let handle = engine.submit_and_run(prompt, dry_run)?;
    let job_id = handle.job_id().to_string();

    if !state.json {
        println!("Started job {} ({} stages)", short(&job_id), engine.get_job(&job_id)?.stages.len());
    }

    tokio::select! {
        outcome = events::follow(&mut rx, &job_id, state.json) => {
            if outcome.is_none() {
                log::warn!("Event stream closed before job {} finished", job_id);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, cancelling job {}", job_id);
            engine.cancel_all();
        }
    }

    let outcome = handle.wait().await?;
    if state.json {
        return print_json(&outcome);
    }

    println!("{}", outcome.message);
    if outcome.is_success() {
        let job = engine.get_job(&job_id)?;
        for output in &job.outputs {
            if let Some(caption) = &output.caption {
                println!("Caption:  {}", caption);
            }
            if !output.hashtags.is_empty() {
                println!("Hashtags: {}", output.hashtags.join(" "));
            }
        }
        Ok(())
    } else {
        bail!("job {} ended as {}", short(&job_id), outcome.status)
    }
}

/// Lists all jobs, newest first.
pub fn list(state: &AppState) -> anyhow::Result<()> {
    let jobs = state.engine.list_jobs();
    if state.json {
        let rows: Vec<JobSummary> = jobs.iter().map(JobSummary::from).collect();
        return print_json(rows);
    }

    if jobs.is_empty() {
        println!("No jobs yet.");
        return Ok(());
    }

    let selected = state.engine.selected_job().map(|j| j.id);
    for job in &jobs {
        let marker = if selected.as_deref() == Some(job.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {:<9} {:>3}%  {}  {}",
            marker,
            job.short_id(),
            job.status.to_string(),
            job.progress,
            job.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            job.prompt
        );
    }
    Ok(())
}

/// Shows one job with its stages and logs.
pub fn show(state: &AppState, id: &str) -> anyhow::Result<()> {
    let job = resolve(state, id)?;
    if state.json {
        return print_json(&job);
    }

    println!("Job      {}", job.id);
    println!("Prompt   {}", job.prompt);
    println!("Status   {}{}", job.status, if job.dry_run { " (dry run)" } else { "" });
    println!("Progress {}%  eta {}s", job.progress, job.eta_seconds);
    println!(
        "Created  {}",
        job.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(error) = &job.error {
        println!("Error    {}", error.message);
    }

    println!();
    for (index, stage) in job.stages.iter().enumerate() {
        println!(
            "{}. {} [{}] {}u",
            index + 1,
            stage.name,
            stage.status,
            stage.expected_duration
        );
        for entry in &stage.log {
            println!("     {}", entry);
        }
    }

    for output in &job.outputs {
        println!();
        if let Some(caption) = &output.caption {
            println!("Caption  {}", caption);
        }
        if !output.hashtags.is_empty() {
            println!("Hashtags {}", output.hashtags.join(" "));
        }
    }
    Ok(())
}

/// Finds a job by full id or unique id prefix.
fn resolve(state: &AppState, id: &str) -> anyhow::Result<Job> {
    if let Ok(job) = state.engine.get_job(id) {
        return Ok(job);
    }

    let mut matches: Vec<Job> = state
        .engine
        .list_jobs()
        .into_iter()
        .filter(|j| j.id.starts_with(id))
        .collect();
    match matches.len() {
        0 => Err(clipflow::EngineError::NotFound(id.to_string()))
            .context("no job with that id or prefix"),
        1 => Ok(matches.remove(0)),
        n => bail!("prefix '{}' matches {} jobs", id, n),
    }
}

fn short(id: &str) -> &str {
    id.get(..6).unwrap_or(id)
}
