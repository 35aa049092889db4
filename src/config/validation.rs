//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Smallest usable line limit: `server:register ` plus a one-character name.
const MIN_LINE_LENGTH: usize = 64;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("limits.outgoing_queue_capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("limits.max_line_length must be at least {MIN_LINE_LENGTH}, got {0}")]
    LineLengthTooSmall(usize),
    #[error("limits.max_name_length must be at least 1")]
    ZeroNameLength,
    #[error("limits.max_name_length ({name}) must fit within limits.max_line_length ({line})")]
    NameLongerThanLine { name: usize, line: usize },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let limits = &config.limits;
    if limits.outgoing_queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }
    if limits.max_line_length < MIN_LINE_LENGTH {
        errors.push(ValidationError::LineLengthTooSmall(limits.max_line_length));
    }
    if limits.max_name_length == 0 {
        errors.push(ValidationError::ZeroNameLength);
    } else if limits.max_name_length > limits.max_line_length {
        errors.push(ValidationError::NameLongerThanLine {
            name: limits.max_name_length,
            line: limits.max_line_length,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[server]
name = "test.courier"

[listen]
address = "127.0.0.1:8080"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_server_name_fails() {
        let toml = r#"
[server]
name = "  "

[listen]
address = "127.0.0.1:8080"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingServerName)));
    }

    #[test]
    fn test_all_limit_errors_reported() {
        let toml = r#"
[listen]
address = "127.0.0.1:8080"

[limits]
outgoing_queue_capacity = 0
max_line_length = 10
max_name_length = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroQueueCapacity)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::LineLengthTooSmall(10))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroNameLength)));
    }

    #[test]
    fn test_name_longer_than_line_fails() {
        let toml = r#"
[listen]
address = "127.0.0.1:8080"

[limits]
max_line_length = 100
max_name_length = 200
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::NameLongerThanLine { name: 200, line: 100 })));
    }

    #[test]
    fn test_zero_mailbox_cap_is_allowed() {
        let toml = r#"
[listen]
address = "127.0.0.1:8080"

[limits]
max_pending_per_recipient = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(validate(&config).is_ok());
    }
}
