//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LifecycleConfig → Result<(), Vec<String>>

use std::net::SocketAddr;

use crate::config::schema::LifecycleConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &LifecycleConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.service.kill_timeout_secs == 0 {
        errors.push("service.kill_timeout_secs must be greater than 0".to_string());
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.diagnostics.address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "diagnostics.address '{}' is not a socket address",
            config.diagnostics.address
        ));
    }

    if config.runtime_metrics.interval_secs == 0 {
        errors.push("runtime_metrics.interval_secs must be greater than 0".to_string());
    }

    if config.http.address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "http.address '{}' is not a socket address",
            config.http.address
        ));
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

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&LifecycleConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = LifecycleConfig::default();
        config.service.kill_timeout_secs = 0;
        config.logging.level = "loud".into();
        config.http.address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("kill_timeout_secs"));
        assert!(errors[1].contains("loud"));
        assert!(errors[2].contains("nowhere"));
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let mut config = LifecycleConfig::default();
        config.logging.level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }
}
