use std::path::Path;

use crate::config::schema::EngineConfig;
use crate::error::ConfigError;
use crate::scheduler::FailurePolicy;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if !config.tick_units.is_finite() || config.tick_units <= 0.0 {
        return Err(ConfigError::Validation {
            message: format!("tick_units must be positive, got {}", config.tick_units),
        });
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "event_capacity must be at least 1".to_string(),
        });
    }

    if config.run_timeout_secs == Some(0) {
        return Err(ConfigError::Validation {
            message: "run_timeout_secs must be positive when set".to_string(),
        });
    }

    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "logging.level must not be empty".to_string(),
        });
    }

    for (stage, policy) in &config.failure_policies {
        if stage.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "failure_policies contains an empty stage name".to_string(),
            });
        }
        if *policy == (FailurePolicy::Retry { attempts: 0 }) {
            return Err(ConfigError::Validation {
                message: format!("retry policy for '{}' needs at least one attempt", stage),
            });
        }
    }

    Ok(())
}
