use crate::job::{Job, JobOutput};
use crate::store::Settings;

pub const PLACEHOLDER_CAPTION: &str = "Sample Islamic reminder caption";
pub const PLACEHOLDER_HASHTAGS: [&str; 3] = ["#Islamic", "#Reminder", "#Tawheed"];

/// Produces the artifacts attached to a job when its run completes.
pub trait OutputSynthesizer: Send + Sync {
    fn synthesize(&self, job: &Job, settings: &Settings) -> Vec<JobOutput>;
}

/// Fixed caption and hashtags, one output per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderOutputs;

impl OutputSynthesizer for PlaceholderOutputs {
    fn synthesize(&self, _job: &Job, _settings: &Settings) -> Vec<JobOutput> {
        vec![JobOutput {
            thumbnail: None,
            caption: Some(PLACEHOLDER_CAPTION.to_string()),
            hashtags: PLACEHOLDER_HASHTAGS.iter().map(|s| s.to_string()).collect(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobFactory;

    #[test]
    fn test_placeholder_output() {
        let job = JobFactory::new().create("Make 3 clips").unwrap();
        let outputs = PlaceholderOutputs.synthesize(&job, &Settings::default());
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].caption.as_deref(), Some(PLACEHOLDER_CAPTION));
        assert_eq!(outputs[0].hashtags, vec!["#Islamic", "#Reminder", "#Tawheed"]);
    }
}
