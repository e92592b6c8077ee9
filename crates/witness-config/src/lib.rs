// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Witness outreach engine.
//!
//! TOML files and `WITNESS_*` environment variables are layered with figment,
//! unknown keys are rejected, and every problem is reported as a miette
//! diagnostic with typo suggestions.
//!
//! ```no_run
//! use witness_config::load_and_validate;
//!
//! match load_and_validate() {
//!     Ok(config) => println!("database: {}", config.storage.database_path),
//!     Err(errors) => witness_config::render_errors(&errors),
//! }
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::WitnessConfig;

/// Loads the standard hierarchy and validates the result.
pub fn load_and_validate() -> Result<WitnessConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Loads one explicit file (plus env overrides) and validates the result.
pub fn load_and_validate_path(path: &Path) -> Result<WitnessConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Loads a TOML string over the defaults and validates the result.
pub fn load_and_validate_str(toml_content: &str) -> Result<WitnessConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

#[allow(clippy::result_large_err)]
fn finish(
    loaded: Result<WitnessConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<WitnessConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            tracing::debug!(database = %config.storage.database_path, "configuration loaded");
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    // figment records the resolved path of the file it read.
    let name = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Some((name.display().to_string(), content))
}

/// Contents of every config file that exists, for error span lookup.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::config_paths()
        .iter()
        .filter_map(|path| read_source(path))
        .collect()
}
