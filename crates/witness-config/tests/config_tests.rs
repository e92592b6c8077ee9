// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Witness configuration system.

use std::io::Write;

use serial_test::serial;
use witness_config::diagnostic::ConfigError;
use witness_config::model::WitnessConfig;
use witness_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

#[test]
fn full_toml_deserializes_into_witness_config() {
    let toml = r##"
[bot]
name = "witness-east"
log_level = "debug"
instance_id = "east-1"

[storage]
database_path = "/tmp/witness.db"
wal_mode = false

[scheduler]
enabled = false
ingest_interval_secs = 600
advance_interval_secs = 120
ingest_lock_ttl_secs = 300
advance_lock_ttl_secs = 60

[ingest]
topics = ["tear gas", "#policeaccountability"]
max_pages = 2
max_posts = 40
seed = 7

[selector]
prior_rate = 0.4
prior_weight = 3.0
exploration_floor = 0.1
seed = 11

[conversation]
form_base_url = "https://forms.example.org/edit"
recontact_after_secs = 60
form_reminder_after_secs = 120
max_contact_attempts = 3

[bridge]
relay_url = "http://relay.local"
relay_token = "secret"
classifier_url = "http://rank.local/frankenbert"
geocoder_key = "key"
request_timeout_secs = 5
"##;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.name, "witness-east");
    assert_eq!(config.bot.instance_id.as_deref(), Some("east-1"));
    assert_eq!(config.storage.database_path, "/tmp/witness.db");
    assert!(!config.storage.wal_mode);
    assert!(!config.scheduler.enabled);
    assert_eq!(config.scheduler.advance_lock_ttl_secs, 60);
    assert_eq!(config.ingest.topics.len(), 2);
    assert_eq!(config.ingest.seed, Some(7));
    assert_eq!(config.selector.prior_weight, 3.0);
    assert_eq!(config.conversation.max_contact_attempts, 3);
    assert_eq!(
        config.bridge.classifier_url.as_deref(),
        Some("http://rank.local/frankenbert")
    );
    assert_eq!(config.bridge.request_timeout_secs, 5);
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.bot.name, "witness");
    assert_eq!(config.bot.log_level, "info");
    assert!(config.bot.instance_id.is_none());
    assert!(config.storage.wal_mode);
    assert!(config.scheduler.enabled);
    assert!(config.ingest.topics.is_empty());
    assert_eq!(config.ingest.max_pages, 5);
    assert!(config.bridge.relay_url.is_none());
}

#[test]
fn unknown_field_is_rejected() {
    let err = load_config_from_str("[ingest]\nmax_pgaes = 3\n").expect_err("should reject");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("max_pgaes"),
        "got: {err_str}"
    );
}

#[test]
fn unknown_section_is_rejected() {
    assert!(load_config_from_str("[metrics]\nenabled = true\n").is_err());
}

#[test]
fn unknown_key_diagnostic_carries_suggestion() {
    let errors = load_and_validate_str("[selector]\nprior_rat = 0.5\n").unwrap_err();
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } if key == "prior_rat" => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("prior_rate"));
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[ingest]\nmax_pages = \"many\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. }))
    );
}

#[test]
fn semantic_errors_surface_through_load_and_validate() {
    let errors = load_and_validate_str("[conversation]\nmax_contact_attempts = 0\n").unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("max_contact_attempts")
    )));
}

#[test]
fn dotted_override_maps_to_section_key() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: WitnessConfig = Figment::new()
        .merge(Serialized::defaults(WitnessConfig::default()))
        .merge(Toml::string("[conversation]\nform_base_url = \"https://a.example/edit\"\n"))
        .merge(("conversation.form_base_url", "https://b.example/edit"))
        .extract()
        .expect("override should merge");
    assert_eq!(config.conversation.form_base_url, "https://b.example/edit");
}

#[test]
#[serial]
fn explicit_file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[bot]\nname = \"from-file\"").unwrap();
    let config = load_config_from_path(file.path()).expect("file should load");
    assert_eq!(config.bot.name, "from-file");
}

#[test]
#[serial]
fn missing_file_falls_back_to_defaults() {
    let config = load_config_from_path(std::path::Path::new("/nonexistent/witness.toml"))
        .expect("missing file is skipped");
    assert_eq!(config.bot.name, "witness");
}

#[test]
#[serial]
fn env_overrides_file_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[scheduler]\nadvance_interval_secs = 600").unwrap();

    // SAFETY: serialized with every other test that reads the environment.
    unsafe {
        std::env::set_var("WITNESS_SCHEDULER_ADVANCE_INTERVAL_SECS", "120");
        std::env::set_var("WITNESS_CONVERSATION_FORM_BASE_URL", "https://env.example/edit");
    }
    let loaded = load_config_from_path(file.path());
    unsafe {
        std::env::remove_var("WITNESS_SCHEDULER_ADVANCE_INTERVAL_SECS");
        std::env::remove_var("WITNESS_CONVERSATION_FORM_BASE_URL");
    }

    let config = loaded.expect("env overrides should merge");
    assert_eq!(config.scheduler.advance_interval_secs, 120);
    assert_eq!(config.conversation.form_base_url, "https://env.example/edit");
}
