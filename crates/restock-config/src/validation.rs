// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of failing on the first one.

use crate::diagnostic::ConfigError;
use crate::model::{EndpointLimit, RestockConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &RestockConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level `{}` is not one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let market = &config.marketplace;
    if !(market.safety_margin > 0.0 && market.safety_margin <= 1.0) {
        errors.push(ConfigError::validation(format!(
            "marketplace.safety_margin must be in (0, 1], got {}",
            market.safety_margin
        )));
    }
    for (name, limit) in [
        ("coefficients_limit", &market.coefficients_limit),
        ("warehouses_limit", &market.warehouses_limit),
        ("supplies_limit", &market.supplies_limit),
        ("general_limit", &market.general_limit),
    ] {
        check_limit(name, limit, &mut errors);
    }
    if market.max_network_attempts == 0 {
        errors.push(ConfigError::validation(
            "marketplace.max_network_attempts must be at least 1",
        ));
    }
    if market.backoff_base_ms > market.backoff_cap_ms {
        errors.push(ConfigError::validation(format!(
            "marketplace.backoff_base_ms ({}) exceeds marketplace.backoff_cap_ms ({})",
            market.backoff_base_ms, market.backoff_cap_ms
        )));
    }

    let worker = &config.worker;
    if worker.workers == 0 {
        errors.push(ConfigError::validation("worker.workers must be at least 1"));
    }
    if worker.max_attempts == 0 {
        errors.push(ConfigError::validation(
            "worker.max_attempts must be at least 1",
        ));
    }
    if worker.stale_timeout_secs <= worker.automation_timeout_secs {
        errors.push(ConfigError::validation(format!(
            "worker.stale_timeout_secs ({}) must exceed worker.automation_timeout_secs ({})",
            worker.stale_timeout_secs, worker.automation_timeout_secs
        )));
    }

    if config.pricing.move_fee < 0 {
        errors.push(ConfigError::validation(format!(
            "pricing.move_fee must be non-negative, got {}",
            config.pricing.move_fee
        )));
    }

    if config.watcher.enabled {
        if config.marketplace.api_token.is_none() {
            errors.push(ConfigError::validation(
                "watcher.enabled requires marketplace.api_token",
            ));
        }
        if config.watcher.poll_interval_secs == 0 {
            errors.push(ConfigError::validation(
                "watcher.poll_interval_secs must be at least 1",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_limit(name: &str, limit: &EndpointLimit, errors: &mut Vec<ConfigError>) {
    if limit.requests == 0 || limit.period_secs == 0 {
        errors.push(ConfigError::validation(format!(
            "marketplace.{name} must allow at least one request per non-zero period"
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&RestockConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let mut config = RestockConfig::default();
        config.worker.workers = 0;
        config.pricing.move_fee = -1;
        config.marketplace.safety_margin = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn watcher_needs_api_token() {
        let mut config = RestockConfig::default();
        config.watcher.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("marketplace.api_token"));

        config.marketplace.api_token = Some("token".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn stale_timeout_must_cover_automation_timeout() {
        let mut config = RestockConfig::default();
        config.worker.stale_timeout_secs = 60;
        config.worker.automation_timeout_secs = 120;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let mut config = RestockConfig::default();
        config.marketplace.supplies_limit = EndpointLimit::per_minute(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("supplies_limit"));
    }
}
