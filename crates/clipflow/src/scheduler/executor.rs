//! Stage execution seam.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::job::Stage;

/// Error reported by an executor for one tick of a stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StageFailure {
    pub message: String,
}

impl StageFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs the work of a stage one increment at a time.
///
/// The scheduler calls `tick` repeatedly until the stage's budget is used
/// up; each call is a suspension point where cancellation and timeouts are
/// observed. The returned value is the number of time units consumed and
/// must be positive.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn tick(&self, stage: &Stage, stage_elapsed: f64) -> Result<f64, StageFailure>;
}

/// Executor that only lets simulated time pass.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    tick_units: f64,
    time_unit: Duration,
}

impl SimulatedExecutor {
    /// `tick_units` per call, each unit lasting `time_unit` of wall time.
    pub fn new(tick_units: f64, time_unit: Duration) -> Self {
        Self {
            tick_units,
            time_unit,
        }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(0.5, Duration::from_secs(1))
    }
}

#[async_trait]
impl StageExecutor for SimulatedExecutor {
    async fn tick(&self, stage: &Stage, stage_elapsed: f64) -> Result<f64, StageFailure> {
        let remaining = (stage.expected_duration - stage_elapsed).max(0.0);
        let step = self.tick_units.min(remaining);
        tokio::time::sleep(self.time_unit.mul_f64(step)).await;
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tick_sleeps_for_step() {
        let executor = SimulatedExecutor::default();
        let stage = Stage::pending("Export", 6.0);

        let start = tokio::time::Instant::now();
        let step = executor.tick(&stage, 0.0).await.unwrap();
        assert_eq!(step, 0.5);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_tick_is_partial() {
        let executor = SimulatedExecutor::default();
        let stage = Stage::pending("Odd", 1.25);

        let step = executor.tick(&stage, 1.0).await.unwrap();
        assert_eq!(step, 0.25);
    }
}
