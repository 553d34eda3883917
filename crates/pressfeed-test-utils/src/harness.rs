// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process registry harness.
//!
//! `TestHarness` assembles a complete registry through the same
//! [`Registry::from_config`] path the binary uses, over a temp directory
//! holding installed plugins and themes, a key file with one key and a
//! whitelist file.

use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use pressfeed_auth::ApiKey;
use pressfeed_config::PressfeedConfig;
use pressfeed_core::{FeedError, PackageKind};
use pressfeed_gateway::{Registry, router};
use secrecy::ExposeSecret;
use tower::ServiceExt;

use crate::fixtures;

fn io_err(e: std::io::Error) -> FeedError {
    FeedError::Internal(format!("fixture setup failed: {e}"))
}

/// Builder for creating test registries.
pub struct TestHarnessBuilder {
    plugins: Vec<(String, String, String)>,
    themes: Vec<(String, String, String)>,
    whitelist: Vec<String>,
    hide_forbidden: bool,
    download_base_url: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            plugins: Vec::new(),
            themes: Vec::new(),
            whitelist: Vec::new(),
            hide_forbidden: true,
            download_base_url: None,
        }
    }

    /// Installs a plugin before the registry starts.
    pub fn plugin(mut self, slug: &str, name: &str, version: &str) -> Self {
        self.plugins.push((slug.into(), name.into(), version.into()));
        self
    }

    /// Installs a theme before the registry starts.
    pub fn theme(mut self, slug: &str, name: &str, version: &str) -> Self {
        self.themes.push((slug.into(), name.into(), version.into()));
        self
    }

    /// Adds entries to the whitelist file.
    pub fn whitelist(mut self, entries: &[&str]) -> Self {
        self.whitelist.extend(entries.iter().map(|e| e.to_string()));
        self
    }

    pub fn hide_forbidden(mut self, hide: bool) -> Self {
        self.hide_forbidden = hide;
        self
    }

    pub fn download_base_url(mut self, base: &str) -> Self {
        self.download_base_url = Some(base.to_string());
        self
    }

    pub fn build(self) -> Result<TestHarness, FeedError> {
        let dir = tempfile::TempDir::new().map_err(io_err)?;
        let plugins_dir = dir.path().join("wp-content/plugins");
        let themes_dir = dir.path().join("wp-content/themes");
        std::fs::create_dir_all(&plugins_dir).map_err(io_err)?;
        std::fs::create_dir_all(&themes_dir).map_err(io_err)?;
        for (slug, name, version) in &self.plugins {
            fixtures::write_plugin(&plugins_dir, slug, name, version).map_err(io_err)?;
        }
        for (slug, name, version) in &self.themes {
            fixtures::write_theme(&themes_dir, slug, name, version).map_err(io_err)?;
        }

        let key = ApiKey::generate("tester");
        let token = key.token().expose_secret().to_string();
        let keys_file = dir.path().join("keys.toml");
        fixtures::write_keys(&keys_file, &[key]).map_err(io_err)?;

        let whitelist_file = dir.path().join("whitelist.toml");
        let entries: Vec<&str> = self.whitelist.iter().map(String::as_str).collect();
        fixtures::write_whitelist(&whitelist_file, &entries).map_err(io_err)?;

        let mut config = PressfeedConfig::default();
        config.server.hide_forbidden = self.hide_forbidden;
        config.server.download_base_url = self.download_base_url;
        config.sources.vendor = "acme".to_string();
        config.sources.plugins_dir = Some(plugins_dir.display().to_string());
        config.sources.themes_dir = Some(themes_dir.display().to_string());
        config.storage.cache_dir = dir.path().join("cache").display().to_string();
        config.whitelist.file = Some(whitelist_file.display().to_string());
        config.auth.api_keys_file = Some(keys_file.display().to_string());

        let registry = Registry::from_config(&config)?;
        let app = router(registry.gateway_state(Some(std::sync::Arc::new(|| {
            "# pressfeed test metrics\n".to_string()
        }))));

        Ok(TestHarness {
            _dir: dir,
            plugins_dir,
            themes_dir,
            keys_file,
            whitelist_file,
            token,
            config,
            registry,
            app,
        })
    }
}

/// A fully buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// A running registry over temp directories.
pub struct TestHarness {
    _dir: tempfile::TempDir,
    plugins_dir: PathBuf,
    themes_dir: PathBuf,
    keys_file: PathBuf,
    whitelist_file: PathBuf,
    token: String,
    config: PressfeedConfig,
    registry: Registry,
    app: Router,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &PressfeedConfig {
        &self.config
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    pub fn themes_dir(&self) -> &Path {
        &self.themes_dir
    }

    pub fn keys_file(&self) -> &Path {
        &self.keys_file
    }

    pub fn whitelist_file(&self) -> &Path {
        &self.whitelist_file
    }

    /// Token of the key written at build time.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// `GET uri` with the harness key as a bearer token.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(uri, Some(format!("Bearer {}", self.token)), &[]).await
    }

    /// `GET uri` with no credentials.
    pub async fn get_anonymous(&self, uri: &str) -> TestResponse {
        self.request(uri, None, &[]).await
    }

    /// `GET uri` with an explicit `Authorization` value and extra headers.
    pub async fn request(
        &self,
        uri: &str,
        authorization: Option<String>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match builder.body(Body::empty()) {
            Ok(request) => request,
            Err(e) => panic!("invalid test request for {uri}: {e}"),
        };
        let response = match self.app.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let headers = response.headers().clone();
        let body = match axum::body::to_bytes(response.into_body(), usize::MAX).await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => panic!("could not read response body for {uri}: {e}"),
        };
        TestResponse { status, headers, body }
    }

    /// Replaces an installed plugin with `version` and drops cached plugin
    /// listings, as the watcher would after an upgrade.
    pub fn upgrade_plugin(&self, slug: &str, name: &str, version: &str) -> Result<(), FeedError> {
        fixtures::write_plugin(&self.plugins_dir, slug, name, version).map_err(io_err)?;
        self.registry.invalidate(Some(PackageKind::Plugin));
        Ok(())
    }

    /// Rewrites the whitelist file and reloads it.
    pub fn set_whitelist(&self, entries: &[&str]) -> Result<usize, FeedError> {
        fixtures::write_whitelist(&self.whitelist_file, entries).map_err(io_err)?;
        self.registry.whitelist.reload()
    }

    /// Rewrites the key file and reloads it.
    pub fn set_keys(&self, keys: &[ApiKey]) -> Result<usize, FeedError> {
        fixtures::write_keys(&self.keys_file, keys).map_err(io_err)?;
        self.registry.keys.reload()
    }
}
