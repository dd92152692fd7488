//! Job data model, stage template and job construction.

pub mod factory;
pub mod model;
pub mod template;

pub use factory::JobFactory;
pub use model::{
    FailureKind, Job, JobFailure, JobId, JobOutput, JobStatus, Stage, StageStatus,
};
pub use template::{default_stages, StageTemplate};
