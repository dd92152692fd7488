//! The fixed seven-stage pipeline.

use serde::{Deserialize, Serialize};

/// Blueprint for one stage of every new job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageTemplate {
    pub name: String,
    pub expected_duration: f64,
}

impl StageTemplate {
    pub fn new(name: impl Into<String>, expected_duration: f64) -> Self {
        Self {
            name: name.into(),
            expected_duration,
        }
    }
}

pub const INGEST: &str = "Ingest & Highlights Detection";
pub const SPEECH_TO_TEXT: &str = "Speech-to-Text & Subtitles";
pub const VIDEO_EDITING: &str = "Video Editing";
pub const QUALITY_GATES: &str = "Quality Gates";
pub const EXPORT: &str = "Export";
pub const CAPTIONS: &str = "Captions & Hashtags";
pub const SCHEDULING: &str = "Scheduling Plan";

/// The canonical stage sequence with its simulated budgets.
pub fn default_stages() -> Vec<StageTemplate> {
    vec![
        StageTemplate::new(INGEST, 8.0),
        StageTemplate::new(SPEECH_TO_TEXT, 10.0),
        StageTemplate::new(VIDEO_EDITING, 12.0),
        StageTemplate::new(QUALITY_GATES, 4.0),
        StageTemplate::new(EXPORT, 6.0),
        StageTemplate::new(CAPTIONS, 4.0),
        StageTemplate::new(SCHEDULING, 3.0),
    ]
}

/// Sum of all template budgets.
pub fn total_duration(templates: &[StageTemplate]) -> f64 {
    templates.iter().map(|t| t.expected_duration).sum()
}
