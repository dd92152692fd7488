//! Job event broadcaster for real-time progress streaming.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::job::Job;
use crate::scheduler::RunOutcome;

/// Event published by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum JobEvent {
    /// Snapshot taken right after a mutation of the job.
    Updated(Job),
    /// A run reached a terminal state.
    Finished(RunOutcome),
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Updated(job) => &job.id,
            JobEvent::Finished(outcome) => &outcome.job_id,
        }
    }
}

/// Fan-out of [`JobEvent`]s to any number of subscribers.
///
/// Sending never blocks and never fails: with no subscribers the event is
/// dropped, and slow subscribers observe `RecvError::Lagged`.
#[derive(Clone)]
pub struct JobEventBroadcaster {
    sender: Arc<broadcast::Sender<JobEvent>>,
}

impl JobEventBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobEventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
