// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. Every failure is
//! collected; validation never stops at the first one.

use crate::diagnostic::ConfigError;
use crate::model::WitnessConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates a deserialized configuration.
pub fn validate_config(config: &WitnessConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.bot.log_level.as_str()) {
        fail(format!(
            "bot.log_level `{}` must be one of {}",
            config.bot.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if let Some(id) = &config.bot.instance_id
        && id.trim().is_empty()
    {
        fail("bot.instance_id must not be empty when set".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let scheduler = &config.scheduler;
    for (key, value) in [
        ("ingest_interval_secs", scheduler.ingest_interval_secs),
        ("advance_interval_secs", scheduler.advance_interval_secs),
        ("ingest_lock_ttl_secs", scheduler.ingest_lock_ttl_secs),
        ("advance_lock_ttl_secs", scheduler.advance_lock_ttl_secs),
    ] {
        if value == 0 {
            fail(format!("scheduler.{key} must be greater than 0"));
        }
    }

    if config.ingest.max_pages == 0 {
        fail("ingest.max_pages must be at least 1".to_string());
    }
    if config.ingest.max_posts == 0 {
        fail("ingest.max_posts must be at least 1".to_string());
    }
    if config.ingest.topics.iter().any(|t| t.trim().is_empty()) {
        fail("ingest.topics must not contain empty entries".to_string());
    }

    let selector = &config.selector;
    if !(0.0..=1.0).contains(&selector.prior_rate) {
        fail(format!(
            "selector.prior_rate must be within [0, 1], got {}",
            selector.prior_rate
        ));
    }
    if selector.prior_weight.is_nan() || selector.prior_weight <= 0.0 {
        fail(format!(
            "selector.prior_weight must be positive, got {}",
            selector.prior_weight
        ));
    }
    let floor = selector.exploration_floor;
    if floor.is_nan() || floor <= 0.0 || floor >= 1.0 {
        fail(format!(
            "selector.exploration_floor must be within (0, 1), got {}",
            selector.exploration_floor
        ));
    }

    let conversation = &config.conversation;
    if !conversation.form_base_url.starts_with("http://")
        && !conversation.form_base_url.starts_with("https://")
    {
        fail(format!(
            "conversation.form_base_url `{}` must be an http(s) URL",
            conversation.form_base_url
        ));
    }
    if conversation.max_contact_attempts == 0 {
        fail("conversation.max_contact_attempts must be at least 1".to_string());
    }

    if config.bridge.request_timeout_secs == 0 {
        fail("bridge.request_timeout_secs must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
