// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./pressfeed.toml` > `~/.config/pressfeed/pressfeed.toml`
//! > `/etc/pressfeed/pressfeed.toml` with environment variable overrides via the
//! `PRESSFEED_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PressfeedConfig;

/// Local config file name, also used under the system and user config dirs.
pub const CONFIG_FILE: &str = "pressfeed.toml";

const SYSTEM_CONFIG: &str = "/etc/pressfeed/pressfeed.toml";

/// Sections recognised in `PRESSFEED_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "server",
    "sources",
    "storage",
    "whitelist",
    "auth",
    "logging",
    "prometheus",
];

/// Candidate config files, lowest precedence first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("pressfeed").join(CONFIG_FILE));
    }
    paths.push(PathBuf::from(CONFIG_FILE));
    paths
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pressfeed/pressfeed.toml` (system-wide)
/// 3. `~/.config/pressfeed/pressfeed.toml` (user XDG config)
/// 4. `./pressfeed.toml` (local directory)
/// 5. `PRESSFEED_*` environment variables
pub fn load_config() -> Result<PressfeedConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only, without files or env vars.
pub fn load_config_from_str(toml_content: &str) -> Result<PressfeedConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PressfeedConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
///
/// Unlike the hierarchy, an explicitly named file must exist.
pub fn load_config_from_path(path: &Path) -> Result<PressfeedConfig, figment::Error> {
    if !path.is_file() {
        return Err(figment::Error::from(format!(
            "config file {} does not exist",
            path.display()
        )));
    }
    Figment::new()
        .merge(Serialized::defaults(PressfeedConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    config_paths().into_iter().fold(
        Figment::new().merge(Serialized::defaults(PressfeedConfig::default())),
        |figment, path| figment.merge(Toml::file(path)),
    )
    .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `PRESSFEED_STORAGE_CACHE_DIR` must map to
/// `storage.cache_dir`, not `storage.cache.dir`.
fn env_provider() -> Env {
    Env::prefixed("PRESSFEED_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped variable name to a dotted key.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
