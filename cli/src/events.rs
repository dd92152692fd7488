//! Renders the job event stream for the terminal.

use clipflow::{Job, JobEvent, RunOutcome};
use log::warn;
use tokio::sync::broadcast::{self, error::RecvError};

/// Tracks what has already been printed for one job.
#[derive(Default)]
pub struct ProgressPrinter {
    last_progress: Option<u8>,
    printed_logs: usize,
}

impl ProgressPrinter {
    /// Lines to print for a new snapshot.
    pub fn render(&mut self, job: &Job) -> Vec<String> {
        let mut lines = Vec::new();

        let logs: Vec<&String> = job.stages.iter().flat_map(|s| s.log.iter()).collect();
        for entry in logs.iter().skip(self.printed_logs) {
            lines.push(format!("  - {}", entry));
        }
        self.printed_logs = self.printed_logs.max(logs.len());

        if self.last_progress != Some(job.progress) {
            self.last_progress = Some(job.progress);
            let stage = job
                .current_stage()
                .map(|(_, s)| s.name.as_str())
                .unwrap_or("");
            lines.push(format!(
                "[{:>3}%] eta {:>2}s  {}",
                job.progress, job.eta_seconds, stage
            ));
        }

        lines
    }
}

/// Prints progress for `job_id` until its run finishes.
///
/// Returns `None` if the event stream closed first.
pub async fn follow(
    rx: &mut broadcast::Receiver<JobEvent>,
    job_id: &str,
    json: bool,
) -> Option<RunOutcome> {
    let mut printer = ProgressPrinter::default();
    loop {
        match rx.recv().await {
            Ok(event) if event.job_id() != job_id => {}
            Ok(JobEvent::Updated(job)) => {
                if json {
                    if let Ok(line) = serde_json::to_string(&JobEvent::Updated(job)) {
                        println!("{}", line);
                    }
                } else {
                    for line in printer.render(&job) {
                        println!("{}", line);
                    }
                }
            }
            Ok(JobEvent::Finished(outcome)) => return Some(outcome),
            Err(RecvError::Lagged(n)) => {
                warn!("Progress stream lagged, missed {} events", n);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
