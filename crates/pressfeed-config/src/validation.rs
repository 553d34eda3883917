// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All problems are
//! collected; validation never stops at the first one.

use crate::diagnostic::ConfigError;
use crate::model::PressfeedConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &PressfeedConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host", "must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(
            "server.host",
            format!("`{host}` is not an IP address or hostname"),
        ));
    }

    if config.server.port == 0 {
        errors.push(ConfigError::validation("server.port", "must be between 1 and 65535"));
    }

    if let Some(base) = &config.server.download_base_url {
        if base.trim().is_empty() {
            errors.push(ConfigError::validation(
                "server.download_base_url",
                "must not be empty when set",
            ));
        }
    }

    if !is_package_segment(&config.sources.vendor) {
        errors.push(ConfigError::validation(
            "sources.vendor",
            format!(
                "`{}` must be lowercase letters, digits, `-`, `_` or `.`",
                config.sources.vendor
            ),
        ));
    }

    if config.sources.plugins_dir.is_none() && config.sources.themes_dir.is_none() {
        errors.push(ConfigError::validation(
            "sources",
            "set at least one of plugins_dir or themes_dir",
        ));
    }
    for (key, dir) in [
        ("sources.plugins_dir", &config.sources.plugins_dir),
        ("sources.themes_dir", &config.sources.themes_dir),
    ] {
        if dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
            errors.push(ConfigError::validation(key, "must not be empty when set"));
        }
    }

    if config.storage.cache_dir.trim().is_empty() {
        errors.push(ConfigError::validation("storage.cache_dir", "must not be empty"));
    }
    for (key, secs) in [
        ("storage.lock_timeout_secs", config.storage.lock_timeout_secs),
        ("storage.build_timeout_secs", config.storage.build_timeout_secs),
        ("storage.cache_timeout_secs", config.storage.cache_timeout_secs),
    ] {
        if secs == 0 {
            errors.push(ConfigError::validation(key, "must be at least 1 second"));
        }
    }

    for entry in &config.whitelist.packages {
        if !is_whitelist_entry(entry) {
            errors.push(ConfigError::validation(
                "whitelist.packages",
                format!("`{entry}` is not a slug or vendor/slug name"),
            ));
        }
    }

    if config.auth.basic_password.is_empty() {
        errors.push(ConfigError::validation("auth.basic_password", "must not be empty"));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::validation(
            "logging.level",
            format!(
                "`{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_package_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

/// `slug` or `vendor/slug`.
pub fn is_whitelist_entry(entry: &str) -> bool {
    match entry.split_once('/') {
        Some((vendor, slug)) => is_package_segment(vendor) && is_package_segment(slug),
        None => is_package_segment(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PressfeedConfig {
        let mut config = PressfeedConfig::default();
        config.sources.plugins_dir = Some("/srv/wp/wp-content/plugins".to_string());
        config
    }

    fn messages(config: &PressfeedConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn configured_source_validates() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn default_config_needs_a_source() {
        let errors = messages(&PressfeedConfig::default());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("plugins_dir or themes_dir"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = valid();
        config.server.port = 0;
        config.storage.build_timeout_secs = 0;
        config.logging.level = "loud".to_string();
        config.whitelist.packages = vec!["Acme/Widget".to_string(), "widget".to_string()];

        let errors = messages(&config);
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("server.port")));
        assert!(errors.iter().any(|e| e.contains("build_timeout_secs")));
        assert!(errors.iter().any(|e| e.contains("Acme/Widget")));
        assert!(errors.iter().any(|e| e.contains("loud")));
    }

    #[test]
    fn whitelist_entry_shapes() {
        assert!(is_whitelist_entry("widget"));
        assert!(is_whitelist_entry("acme/widget-pro"));
        assert!(!is_whitelist_entry("acme/"));
        assert!(!is_whitelist_entry("a/b/c"));
        assert!(!is_whitelist_entry(""));
    }

    #[test]
    fn bad_host_is_rejected() {
        let mut config = valid();
        config.server.host = "bad host!".to_string();
        assert!(messages(&config).iter().any(|e| e.contains("server.host")));
        config.server.host = "::1".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
