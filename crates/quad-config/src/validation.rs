// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, non-empty paths, and non-zero intervals.

use crate::diagnostic::ConfigError;
use crate::model::QuadConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or every collected error
/// (does not fail fast).
pub fn validate_config(config: &QuadConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::Validation {
            message: "gateway.port must be non-zero".to_string(),
        });
    }

    if let Some(token) = &config.gateway.bearer_token {
        if token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "gateway.bearer_token must not be empty when set".to_string(),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.calls.ring_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "calls.ring_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.escalation.sweep_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "escalation.sweep_interval_secs must be at least 1".to_string(),
        });
    }

    for (key, secs) in [
        ("director_after_secs", config.escalation.director_after_secs),
        ("owner_after_secs", config.escalation.owner_after_secs),
    ] {
        if secs == 0 {
            errors.push(ConfigError::Validation {
                message: format!("escalation.{key} must be at least 1"),
            });
        }
    }

    if let Some(dept) = &config.escalation.department {
        if dept.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "escalation.department must not be empty when set".to_string(),
            });
        }
    }

    let level = config.server.log_level.as_str();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level `{level}` must be one of trace, debug, info, warn, error"
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
