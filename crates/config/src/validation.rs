//! Configuration validation

use crate::{ConfigError, NegotiationConfig, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the whole configuration, reporting every invalid field at once
pub fn validate_config(config: &NegotiationConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.participant_id.trim().is_empty() {
        errors.push(ValidationError::new("participant_id", "must not be empty"));
    }

    let sm = &config.state_machine;
    if sm.batch_size == 0 {
        errors.push(ValidationError::new(
            "state_machine.batch_size",
            "must be greater than 0",
        ));
    }

    if sm.lease_duration_ms == 0 {
        errors.push(ValidationError::new(
            "state_machine.lease_duration_ms",
            "must be greater than 0",
        ));
    }

    if sm.backoff_base_ms > sm.backoff_max_ms {
        errors.push(ValidationError::new(
            "state_machine.backoff_base_ms",
            format!("must be <= backoff_max_ms ({})", sm.backoff_max_ms),
        ));
    }

    let retry = &config.retry;
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.base_delay_ms",
            format!("must be <= max_delay_ms ({})", retry.max_delay_ms),
        ));
    }

    if let Err(e) = validate_log_level(&config.logging.level) {
        errors.push(e);
    }

    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "logging.level",
            format!("invalid log level '{level}', must be one of: trace, debug, info, warn, error"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> NegotiationConfig {
        NegotiationConfig {
            participant_id: "provider-1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_participant_id() {
        let config = NegotiationConfig::default();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("participant_id: must not be empty"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.state_machine.batch_size = 0;
        config.retry.base_delay_ms = 10_000;
        config.retry.max_delay_ms = 1_000;
        config.logging.level = "verbose".to_string();

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("state_machine.batch_size"));
                assert!(msg.contains("retry.base_delay_ms"));
                assert!(msg.contains("logging.level"));
                assert_eq!(msg.matches("; ").count(), 2);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = valid_config();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
