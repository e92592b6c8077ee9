// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Lookup order, later wins: compiled defaults, `/etc/witness/witness.toml`,
//! `~/.config/witness/witness.toml`, `./witness.toml`, then `WITNESS_*`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WitnessConfig;

/// File name looked up in every configuration directory.
pub const CONFIG_FILE_NAME: &str = "witness.toml";

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/witness/witness.toml";

/// Top-level sections, used to map `WITNESS_<SECTION>_<KEY>` to `section.key`.
const SECTIONS: &[&str] = &[
    "bot",
    "storage",
    "scheduler",
    "ingest",
    "selector",
    "conversation",
    "bridge",
];

/// Candidate files in merge order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("witness").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Loads configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<WitnessConfig, figment::Error> {
    build_figment().extract()
}

/// Loads configuration from a TOML string over the defaults. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<WitnessConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WitnessConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads configuration from one explicit file, with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WitnessConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WitnessConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    config_paths().into_iter().fold(
        Figment::new().merge(Serialized::defaults(WitnessConfig::default())),
        |figment, path| figment.merge(Toml::file(path)),
    )
    .merge(env_provider())
}

/// Maps `witness_`-stripped, lowercased env keys to dotted config paths.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `WITNESS_CONVERSATION_FORM_BASE_URL` lands on `conversation.form_base_url`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("WITNESS_").map(|key| map_env_key(key.as_str()).into())
}
