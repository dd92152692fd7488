use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What the scheduler does when a stage reports a failure.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Retry the failing tick up to `attempts` times, then abort.
    Retry { attempts: u32 },
    /// Mark the stage and the job failed.
    #[default]
    AbortJob,
    /// Mark the stage skipped and continue with the next one.
    SkipStage,
}

/// Failure policies keyed by stage name.
pub type FailurePolicies = HashMap<String, FailurePolicy>;

pub fn policy_for(policies: &FailurePolicies, stage_name: &str) -> FailurePolicy {
    policies.get(stage_name).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_abort() {
        let policies = FailurePolicies::new();
        assert_eq!(policy_for(&policies, "Export"), FailurePolicy::AbortJob);
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{
            "Export": {"action": "retry", "attempts": 3},
            "Scheduling Plan": {"action": "skip_stage"}
        }"#;
        let policies: FailurePolicies = serde_json::from_str(json).unwrap();
        assert_eq!(
            policy_for(&policies, "Export"),
            FailurePolicy::Retry { attempts: 3 }
        );
        assert_eq!(
            policy_for(&policies, "Scheduling Plan"),
            FailurePolicy::SkipStage
        );
    }
}
