// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the pressfeed registry.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level pressfeed configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PressfeedConfig {
    /// HTTP listener and response settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Where installed plugins and themes live.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Archive cache settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Packages exposed through the feed.
    #[serde(default)]
    pub whitelist: WhitelistConfig,

    /// API key settings.
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix of `dist.url` in the feed. `None` keeps URLs relative
    /// (`/download/<slug>/<version>`) so the feed does not depend on the
    /// host name it is served under.
    #[serde(default)]
    pub download_base_url: Option<String>,

    /// Answer 404 instead of 403 for installed packages that are not
    /// whitelisted, so their existence is not revealed.
    #[serde(default = "default_true")]
    pub hide_forbidden: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            download_base_url: None,
            hide_forbidden: true,
        }
    }
}

impl ServerConfig {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8480
}

fn default_true() -> bool {
    true
}

/// Installed component directories.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Composer vendor name prefixed to every package.
    #[serde(default = "default_vendor")]
    pub vendor: String,

    /// Directory containing one sub-directory per installed plugin.
    #[serde(default)]
    pub plugins_dir: Option<String>,

    /// Directory containing one sub-directory per installed theme.
    #[serde(default)]
    pub themes_dir: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            vendor: default_vendor(),
            plugins_dir: None,
            themes_dir: None,
        }
    }
}

fn default_vendor() -> String {
    "pressfeed".to_string()
}

/// Archive cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root of the archive cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Upper bound on waiting for another build of the same release.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Upper bound on waiting for a build to finish.
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,

    /// Upper bound on waiting for a repository listing to be computed.
    #[serde(default = "default_cache_timeout_secs")]
    pub cache_timeout_secs: u64,

    /// File and directory names left out of archives.
    #[serde(default = "default_archive_excludes")]
    pub archive_excludes: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            lock_timeout_secs: default_lock_timeout_secs(),
            build_timeout_secs: default_build_timeout_secs(),
            cache_timeout_secs: default_cache_timeout_secs(),
            archive_excludes: default_archive_excludes(),
        }
    }
}

impl StorageConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }
}

fn default_cache_dir() -> String {
    dirs::cache_dir()
        .map(|p| p.join("pressfeed").join("releases"))
        .unwrap_or_else(|| std::path::PathBuf::from("pressfeed-cache"))
        .to_string_lossy()
        .into_owned()
}

fn default_lock_timeout_secs() -> u64 {
    30
}

fn default_build_timeout_secs() -> u64 {
    120
}

fn default_cache_timeout_secs() -> u64 {
    30
}

fn default_archive_excludes() -> Vec<String> {
    [".git", ".svn", ".DS_Store"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Whitelist configuration.
///
/// Entries are bare slugs (`widget`) or full names (`acme/widget`). The
/// effective whitelist is the union of `packages` and the entries of `file`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhitelistConfig {
    #[serde(default)]
    pub packages: Vec<String>,

    /// TOML file with a `packages = [...]` array, reloaded on change.
    #[serde(default)]
    pub file: Option<String>,
}

/// API key configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// TOML file with `[[keys]]` entries, reloaded on change. Without it no
    /// request can authenticate.
    #[serde(default)]
    pub api_keys_file: Option<String>,

    /// Password expected alongside the token in Basic credentials.
    #[serde(default = "default_basic_password")]
    pub basic_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_keys_file: None,
            basic_password: default_basic_password(),
        }
    }
}

fn default_basic_password() -> String {
    "pressfeed".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the recorder and serve `/metrics`.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
