//! Runs jobs through their stages and reports progress.

pub mod executor;
pub mod outputs;
pub mod policy;
pub mod runner;

pub use executor::{SimulatedExecutor, StageExecutor, StageFailure};
pub use outputs::{OutputSynthesizer, PlaceholderOutputs};
pub use policy::{FailurePolicies, FailurePolicy};
pub use runner::{RunHandle, RunOutcome, SchedulerOptions, StageScheduler};
