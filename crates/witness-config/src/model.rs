// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Witness outreach engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Witness configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WitnessConfig {
    /// Bot identity settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Recurring job settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Ingestion pipeline settings.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Script selection policy.
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Conversation timing and form link settings.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// HTTP endpoints of the external collaborators.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Instance name prefixed to each process's lock holder id.
    #[serde(default)]
    pub instance_id: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
            instance_id: None,
        }
    }
}

fn default_bot_name() -> String {
    "witness".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("witness").join("witness.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "witness.db".to_string())
}

fn default_true() -> bool {
    true
}

/// Recurring job configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Run the recurring jobs under `serve`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between ingestion runs.
    #[serde(default = "default_ingest_interval_secs")]
    pub ingest_interval_secs: u64,

    /// Seconds between advancement runs.
    #[serde(default = "default_advance_interval_secs")]
    pub advance_interval_secs: u64,

    /// Lock TTL for the ingestion job, in seconds.
    #[serde(default = "default_lock_ttl_secs")]
    pub ingest_lock_ttl_secs: u64,

    /// Lock TTL for the advancement job, in seconds.
    #[serde(default = "default_lock_ttl_secs")]
    pub advance_lock_ttl_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ingest_interval_secs: default_ingest_interval_secs(),
            advance_interval_secs: default_advance_interval_secs(),
            ingest_lock_ttl_secs: default_lock_ttl_secs(),
            advance_lock_ttl_secs: default_lock_ttl_secs(),
        }
    }
}

fn default_ingest_interval_secs() -> u64 {
    4 * 60 * 60
}

fn default_advance_interval_secs() -> u64 {
    60 * 60
}

fn default_lock_ttl_secs() -> u64 {
    15 * 60
}

/// Ingestion pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Topic queries. Empty means the built-in curated list.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Maximum pages fetched per run.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum posts collected per run.
    #[serde(default = "default_max_posts")]
    pub max_posts: usize,

    /// Seed for topic choice. Unset means entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            max_pages: default_max_pages(),
            max_posts: default_max_posts(),
            seed: None,
        }
    }
}

fn default_max_pages() -> usize {
    5
}

fn default_max_posts() -> usize {
    100
}

/// Script selection policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorConfig {
    /// Success rate assumed for a script with no history.
    #[serde(default = "default_prior_rate")]
    pub prior_rate: f64,

    /// How many pseudo-uses the prior is worth.
    #[serde(default = "default_prior_weight")]
    pub prior_weight: f64,

    /// Minimum share of weight every active script keeps.
    #[serde(default = "default_exploration_floor")]
    pub exploration_floor: f64,

    /// Seed for selection. Unset means entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            prior_rate: default_prior_rate(),
            prior_weight: default_prior_weight(),
            exploration_floor: default_exploration_floor(),
            seed: None,
        }
    }
}

fn default_prior_rate() -> f64 {
    0.5
}

fn default_prior_weight() -> f64 {
    2.0
}

fn default_exploration_floor() -> f64 {
    0.05
}

/// Conversation timing and form link configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Base URL of the incident form; the subject id is appended.
    #[serde(default = "default_form_base_url")]
    pub form_base_url: String,

    /// Seconds without a reply before the confirmation is re-sent.
    #[serde(default = "default_recontact_after_secs")]
    pub recontact_after_secs: u64,

    /// Seconds after the form link before a reminder is sent.
    #[serde(default = "default_form_reminder_after_secs")]
    pub form_reminder_after_secs: u64,

    /// Confirmation messages sent before giving up on a subject.
    #[serde(default = "default_max_contact_attempts")]
    pub max_contact_attempts: u32,

    /// Form reminders sent before the bot stops nudging. Zero disables them.
    #[serde(default = "default_max_form_reminders")]
    pub max_form_reminders: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            form_base_url: default_form_base_url(),
            recontact_after_secs: default_recontact_after_secs(),
            form_reminder_after_secs: default_form_reminder_after_secs(),
            max_contact_attempts: default_max_contact_attempts(),
            max_form_reminders: default_max_form_reminders(),
        }
    }
}

fn default_form_base_url() -> String {
    "https://a.humanrightsfirst.dev/edit".to_string()
}

fn default_recontact_after_secs() -> u64 {
    3 * 24 * 60 * 60
}

fn default_form_reminder_after_secs() -> u64 {
    2 * 24 * 60 * 60
}

fn default_max_contact_attempts() -> u32 {
    2
}

fn default_max_form_reminders() -> u32 {
    2
}

/// HTTP endpoints of the external collaborators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the messaging/search relay.
    #[serde(default)]
    pub relay_url: Option<String>,

    /// Bearer token for the relay.
    #[serde(default)]
    pub relay_token: Option<String>,

    /// Ranking model endpoint.
    #[serde(default)]
    pub classifier_url: Option<String>,

    /// Places API base URL.
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Places API key.
    #[serde(default)]
    pub geocoder_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            relay_token: None,
            classifier_url: None,
            geocoder_url: default_geocoder_url(),
            geocoder_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_geocoder_url() -> String {
    "https://maps.googleapis.com/maps/api/place/findplacefromtext/json".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_defaults_match_job_cadence() {
        let config = SchedulerConfig::default();
        assert_eq!(config.advance_interval_secs, 3600);
        assert_eq!(config.ingest_interval_secs, 14_400);
        assert!(config.advance_lock_ttl_secs < config.advance_interval_secs);
    }

    #[test]
    fn selector_defaults_are_neutral() {
        let config = SelectorConfig::default();
        assert_eq!(config.prior_rate, 0.5);
        assert!(config.exploration_floor > 0.0);
        assert!(config.seed.is_none());
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: WitnessConfig = toml::from_str(
            r#"
[conversation]
max_contact_attempts = 4
"#,
        )
        .unwrap();
        assert_eq!(config.conversation.max_contact_attempts, 4);
        assert_eq!(config.conversation.recontact_after_secs, 259_200);
        assert_eq!(config.conversation.max_form_reminders, 2);
        assert!(config.conversation.form_base_url.ends_with("/edit"));
    }

    #[test]
    fn bridge_rejects_unknown_fields() {
        let result = toml::from_str::<WitnessConfig>(
            r#"
[bridge]
relay = "http://localhost"
"#,
        );
        assert!(result.is_err());
    }
}
