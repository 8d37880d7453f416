//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and addresses
//! - Compile every policy rule so bad patterns and templates are caught
//!   before the config is accepted
//! - Reject rule shapes that are almost certainly mistakes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::policy::PermissionConfig;
use crate::config::schema::GatewayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            "must be greater than zero",
        ));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "invalid socket address '{}'",
                config.observability.metrics_address
            ),
        ));
    }

    validate_rules("policy.allow", &config.policy.allow, &mut errors);
    validate_rules("policy.deny", &config.policy.deny, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_rules(list: &str, rules: &[PermissionConfig], errors: &mut Vec<ValidationError>) {
    for (i, rule) in rules.iter().enumerate() {
        let field = format!("{}[{}]", list, i);

        if rule.all_routes && !rule.paths.is_empty() {
            errors.push(ValidationError::new(
                &field,
                "'paths' cannot be combined with 'all_routes'",
            ));
        }
        if !rule.all_routes && !rule.exclude.is_empty() {
            errors.push(ValidationError::new(
                &field,
                "'exclude' only applies to 'all_routes' rules",
            ));
        }
        if let Err(e) = rule.compile() {
            errors.push(ValidationError::new(&field, e.to_string()));
        }
    }
}
