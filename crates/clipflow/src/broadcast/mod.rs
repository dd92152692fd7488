//! Broadcasting of job snapshots and run notifications.
//!
//! Any front end (CLI, service, tests) can subscribe and render the stream.

pub mod job_events;

pub use job_events::{JobEvent, JobEventBroadcaster};
