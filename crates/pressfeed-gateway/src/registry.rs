// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the registry components from configuration.
//!
//! Composition is explicit: every component is constructed here, in
//! dependency order, and handed to the pieces that use it.

use std::path::PathBuf;
use std::sync::Arc;

use pressfeed_auth::{ApiKeyStore, AuthChain, FileApiKeyStore, default_chain};
use pressfeed_config::PressfeedConfig;
use pressfeed_core::{FeedError, PackageId, PackageKind, Repository};
use pressfeed_release::{Archive, Archiver, ReleaseManager, ReleaseManagerConfig};
use pressfeed_repository::{
    CachedRepository, DEFAULT_DOWNLOAD_BASE, HeaderVersion, InstalledSource, MetadataTransformer,
    MultiRepository, PackageFactory, Whitelist, WhitelistRepository,
};
use pressfeed_storage::LocalStorage;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::server::{GatewayState, HealthState};

/// Every long-lived component of a running registry.
pub struct Registry {
    pub storage: Arc<LocalStorage>,
    pub releases: ReleaseManager,
    /// One cache per installed source, in registration order.
    pub caches: Vec<(PackageKind, Arc<CachedRepository>)>,
    pub whitelist: Arc<Whitelist>,
    pub repository: Arc<WhitelistRepository>,
    pub keys: Arc<FileApiKeyStore>,
    pub auth: Arc<AuthChain>,
    pub transformer: MetadataTransformer,
    pub hide_forbidden: bool,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("storage", &self.storage.root())
            .field("sources", &self.caches.len())
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn from_config(config: &PressfeedConfig) -> Result<Self, FeedError> {
        let storage = Arc::new(LocalStorage::new(&config.storage.cache_dir)?);
        let releases = ReleaseManager::with_version_check(
            storage.clone(),
            Archiver::new(config.storage.archive_excludes.iter().cloned()),
            ReleaseManagerConfig {
                lock_timeout: config.storage.lock_timeout(),
                build_timeout: config.storage.build_timeout(),
            },
            Arc::new(HeaderVersion),
        );

        let factory = Arc::new(
            PackageFactory::new(config.sources.vendor.clone()).with_release_manager(releases.clone()),
        );
        let mut caches = Vec::new();
        let dirs = [
            (PackageKind::Plugin, &config.sources.plugins_dir),
            (PackageKind::Theme, &config.sources.themes_dir),
        ];
        for (kind, dir) in dirs {
            if let Some(dir) = dir {
                let source = InstalledSource::new(kind, PathBuf::from(dir), factory.clone());
                let cache = CachedRepository::new(Arc::new(source), config.storage.cache_timeout());
                caches.push((kind, Arc::new(cache)));
            }
        }
        let children: Vec<Arc<dyn Repository>> = caches
            .iter()
            .map(|(_, cache)| cache.clone() as Arc<dyn Repository>)
            .collect();
        let installed = Arc::new(MultiRepository::new("installed", children));

        let whitelist = Arc::new(match &config.whitelist.file {
            Some(file) => Whitelist::with_file(config.whitelist.packages.iter().cloned(), file)?,
            None => Whitelist::new(config.whitelist.packages.iter().cloned()),
        });
        if whitelist.snapshot().is_empty() {
            warn!("whitelist is empty, the feed will not expose any package");
        }
        let repository = Arc::new(WhitelistRepository::new(installed, whitelist.clone()));

        let keys = Arc::new(match &config.auth.api_keys_file {
            Some(file) => FileApiKeyStore::open(file)?,
            None => FileApiKeyStore::from_keys(Vec::new())?,
        });
        if keys.is_empty() {
            warn!("no api keys configured, every registry request will be denied");
        }
        let auth = Arc::new(default_chain(
            keys.clone(),
            SecretString::from(config.auth.basic_password.clone()),
        ));

        let transformer = MetadataTransformer::new(
            config
                .server
                .download_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_BASE.to_string()),
        );

        info!(
            cache_dir = %storage.root().display(),
            sources = caches.len(),
            whitelisted = whitelist.snapshot().len(),
            keys = keys.len(),
            "registry assembled"
        );
        Ok(Self {
            storage,
            releases,
            caches,
            whitelist,
            repository,
            keys,
            auth,
            transformer,
            hide_forbidden: config.server.hide_forbidden,
        })
    }

    pub fn gateway_state(&self, prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> GatewayState {
        GatewayState {
            repository: self.repository.clone(),
            releases: self.releases.clone(),
            transformer: self.transformer.clone(),
            auth: self.auth.clone(),
            hide_forbidden: self.hide_forbidden,
            health: HealthState::new(prometheus_render),
        }
    }

    /// Drops cached listings of sources of `kind`, or of every source.
    pub fn invalidate(&self, kind: Option<PackageKind>) {
        for (source_kind, cache) in &self.caches {
            if kind.is_none_or(|k| k == *source_kind) {
                cache.invalidate();
            }
        }
    }

    /// Builds or confirms the archive of the installed version of every
    /// visible package, so each installed version stays downloadable after
    /// an upgrade replaces it on disk.
    ///
    /// Failures are logged per package and do not stop the others.
    pub async fn archive_visible(&self) -> Result<Vec<(PackageId, Result<Archive, FeedError>)>, FeedError> {
        let mut results = Vec::new();
        for package in self.repository.list_packages().await? {
            match self.releases.archive_current(&package).await {
                Ok(Some(archive)) => results.push((package.id().clone(), Ok(archive))),
                Ok(None) => {}
                Err(e) => {
                    warn!(package = %package.id(), error = %e, "could not archive installed version");
                    results.push((package.id().clone(), Err(e)));
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressfeed_auth::AuthRequest;
    use pressfeed_core::AuthOutcome;

    fn config(root: &std::path::Path) -> PressfeedConfig {
        let plugins = root.join("plugins/widget");
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(
            plugins.join("widget.php"),
            "<?php\n/*\n * Plugin Name: Widget\n * Version: 1.0.0\n */\n",
        )
        .unwrap();

        let mut config = PressfeedConfig::default();
        config.sources.plugins_dir = Some(root.join("plugins").display().to_string());
        config.storage.cache_dir = root.join("cache").display().to_string();
        config.whitelist.packages = vec!["widget".to_string()];
        config
    }

    #[tokio::test]
    async fn assembles_one_cache_per_configured_source() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::from_config(&config(dir.path())).unwrap();
        assert_eq!(registry.caches.len(), 1);
        assert_eq!(registry.caches[0].0, PackageKind::Plugin);

        let packages = registry.repository.list_packages().await.unwrap();
        assert_eq!(packages.len(), 1);
        assert!(registry.caches[0].1.is_warm());

        registry.invalidate(Some(PackageKind::Theme));
        assert!(registry.caches[0].1.is_warm());
        registry.invalidate(None);
        assert!(!registry.caches[0].1.is_warm());
    }

    #[tokio::test]
    async fn without_key_file_every_request_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::from_config(&config(dir.path())).unwrap();
        assert!(registry.keys.is_empty());
        let outcome = registry
            .auth
            .authenticate(&AuthRequest::new(Some("Bearer anything"), "/packages.json"))
            .await;
        assert!(matches!(outcome, AuthOutcome::Denied { .. }));
    }

    #[tokio::test]
    async fn archive_visible_builds_installed_versions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::from_config(&config(dir.path())).unwrap();
        let results = registry.archive_visible().await.unwrap();
        assert_eq!(results.len(), 1);
        let archive = results[0].1.as_ref().unwrap();
        assert_eq!(archive.file_name, "widget-1.0.0.zip");
        assert_eq!(registry.releases.build_count(), 1);
    }
}
