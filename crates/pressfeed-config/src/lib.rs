// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the pressfeed registry.
//!
//! TOML configuration with strict key checking (`deny_unknown_fields`), an
//! XDG file hierarchy, `PRESSFEED_*` environment overrides and miette
//! diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use pressfeed_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on {}", config.server.bind_address());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::PressfeedConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors are converted to diagnostics with source spans; a
/// configuration that parses is then checked by [`validation::validate_config`].
pub fn load_and_validate() -> Result<PressfeedConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load and validate one explicitly named file (plus env overrides).
pub fn load_and_validate_path(path: &Path) -> Result<PressfeedConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load and validate a TOML string. Useful for tests.
pub fn load_and_validate_str(toml_content: &str) -> Result<PressfeedConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<PressfeedConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<PressfeedConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::from_figment(err, &sources())),
    }
}

/// Contents of the hierarchy's existing files, for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::config_paths()
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            let shown = std::fs::canonicalize(&path).unwrap_or(path);
            Some((shown.display().to_string(), content))
        })
        .collect()
}
