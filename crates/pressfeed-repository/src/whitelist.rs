// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of packages exposed through the feed, and the repository view
//! that enforces it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use pressfeed_core::{FeedError, Package, Repository};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// On-disk form of the whitelist file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WhitelistFile {
    #[serde(default)]
    packages: Vec<String>,
}

/// Entries are bare slugs (`widget`) or full names (`acme/widget`).
///
/// Readers take a snapshot per call; [`Whitelist::reload`] swaps in a new
/// set atomically.
#[derive(Debug)]
pub struct Whitelist {
    fixed: BTreeSet<String>,
    file: Option<PathBuf>,
    entries: ArcSwap<BTreeSet<String>>,
}

impl Whitelist {
    /// A whitelist with fixed entries and no backing file.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fixed: BTreeSet<String> = entries.into_iter().map(Into::into).collect();
        Self {
            entries: ArcSwap::from_pointee(fixed.clone()),
            fixed,
            file: None,
        }
    }

    /// Fixed entries plus those read from `file`. A missing file contributes
    /// nothing until it appears and the whitelist is reloaded.
    pub fn with_file<I, S>(entries: I, file: impl Into<PathBuf>) -> Result<Self, FeedError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut whitelist = Self::new(entries);
        whitelist.file = Some(file.into());
        whitelist.reload()?;
        Ok(whitelist)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Re-reads the backing file. On error the previous snapshot stays.
    pub fn reload(&self) -> Result<usize, FeedError> {
        let mut entries = self.fixed.clone();
        if let Some(path) = &self.file {
            entries.extend(read_file(path)?);
        }
        let count = entries.len();
        self.entries.store(Arc::new(entries));
        info!(entries = count, "whitelist loaded");
        Ok(count)
    }

    pub fn snapshot(&self) -> Arc<BTreeSet<String>> {
        self.entries.load_full()
    }

    /// True if `name` (slug or `vendor/slug`) is whitelisted.
    ///
    /// A bare slug is allowed when any entry names that slug, with or
    /// without a vendor.
    pub fn allows(&self, name: &str) -> bool {
        let entries = self.entries.load();
        if entries.contains(name) {
            return true;
        }
        match name.split_once('/') {
            Some((_, slug)) => entries.contains(slug),
            None => entries
                .iter()
                .any(|entry| entry.split_once('/').is_some_and(|(_, s)| s == name)),
        }
    }

    pub fn allows_package(&self, package: &Package) -> bool {
        let entries = self.entries.load();
        entries.iter().any(|entry| package.matches(entry))
    }
}

fn read_file(path: &Path) -> Result<Vec<String>, FeedError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "whitelist file not found, using configured entries only");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(FeedError::Config(format!(
                "cannot read whitelist file {}: {e}",
                path.display()
            )));
        }
    };
    let parsed: WhitelistFile = toml::from_str(&raw).map_err(|e| {
        FeedError::Config(format!("invalid whitelist file {}: {e}", path.display()))
    })?;
    Ok(parsed
        .packages
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect())
}

/// Exposes only whitelisted packages of the inner repository.
///
/// Filtering happens on every read, so whitelist changes take effect
/// without touching any cache below.
pub struct WhitelistRepository {
    name: String,
    inner: Arc<dyn Repository>,
    whitelist: Arc<Whitelist>,
}

impl WhitelistRepository {
    pub fn new(inner: Arc<dyn Repository>, whitelist: Arc<Whitelist>) -> Self {
        Self {
            name: format!("whitelist({})", inner.name()),
            inner,
            whitelist,
        }
    }

    pub fn whitelist(&self) -> &Arc<Whitelist> {
        &self.whitelist
    }

    /// True if the package exists below the whitelist, visible or not.
    pub async fn is_installed(&self, slug: &str) -> Result<bool, FeedError> {
        self.inner.has_package(slug).await
    }
}

#[async_trait]
impl Repository for WhitelistRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
        let mut packages = self.inner.list_packages().await?;
        packages.retain(|package| self.whitelist.allows_package(package));
        Ok(packages)
    }

    async fn get_package(&self, slug: &str) -> Result<Option<Package>, FeedError> {
        if !self.whitelist.allows(slug) {
            debug!(slug, "package not whitelisted");
            return Ok(None);
        }
        Ok(self
            .inner
            .get_package(slug)
            .await?
            .filter(|package| self.whitelist.allows_package(package)))
    }

    async fn has_package(&self, slug: &str) -> Result<bool, FeedError> {
        Ok(self.get_package(slug).await?.is_some())
    }

    fn invalidate(&self) {
        self.inner.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pressfeed_core::{PackageId, PackageKind};

    use super::*;

    struct Fixed {
        packages: Vec<Package>,
        lists: AtomicUsize,
    }

    #[async_trait]
    impl Repository for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            Ok(self.packages.clone())
        }
    }

    fn fixed(slugs: &[&str]) -> Arc<Fixed> {
        let packages = slugs
            .iter()
            .map(|slug| {
                Package::builder(PackageId::new("acme", *slug), PackageKind::Plugin, "/srv").build()
            })
            .collect();
        Arc::new(Fixed {
            packages,
            lists: AtomicUsize::new(0),
        })
    }

    #[test]
    fn entries_match_slug_or_full_name() {
        let whitelist = Whitelist::new(["widget", "acme/gadget"]);
        assert!(whitelist.allows("widget"));
        assert!(whitelist.allows("acme/widget"));
        assert!(whitelist.allows("gadget"));
        assert!(whitelist.allows("acme/gadget"));
        assert!(!whitelist.allows("other/gadget"));
        assert!(!whitelist.allows("gizmo"));
    }

    #[tokio::test]
    async fn listing_is_filtered() {
        let inner = fixed(&["gadget", "widget"]);
        let repo = WhitelistRepository::new(inner, Arc::new(Whitelist::new(["acme/widget"])));
        let slugs: Vec<String> = repo
            .list_packages()
            .await
            .unwrap()
            .iter()
            .map(|p| p.slug().to_string())
            .collect();
        assert_eq!(slugs, vec!["widget"]);
    }

    #[tokio::test]
    async fn lookup_of_hidden_slug_never_lists() {
        let inner = fixed(&["gadget", "widget"]);
        let repo = WhitelistRepository::new(inner.clone(), Arc::new(Whitelist::new(["widget"])));

        assert!(repo.get_package("gadget").await.unwrap().is_none());
        assert!(!repo.has_package("gadget").await.unwrap());
        assert_eq!(inner.lists.load(Ordering::SeqCst), 0);

        assert!(repo.has_package("widget").await.unwrap());
        assert!(repo.is_installed("gadget").await.unwrap());
        assert!(!repo.is_installed("gizmo").await.unwrap());
    }

    #[tokio::test]
    async fn invalidation_reaches_wrapped_caches() {
        let inner = fixed(&["widget"]);
        let cached = Arc::new(crate::CachedRepository::new(inner.clone(), std::time::Duration::from_secs(5)));
        let union = Arc::new(crate::MultiRepository::new("installed", vec![cached.clone() as Arc<dyn Repository>]));
        let repo = WhitelistRepository::new(union, Arc::new(Whitelist::new(["widget"])));

        repo.list_packages().await.unwrap();
        repo.list_packages().await.unwrap();
        assert_eq!(inner.lists.load(Ordering::SeqCst), 1);

        repo.invalidate();
        assert!(!cached.is_warm());
        repo.list_packages().await.unwrap();
        assert_eq!(inner.lists.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reload_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.toml");
        std::fs::write(&path, "packages = [\"widget\"]\n").unwrap();

        let whitelist = Whitelist::with_file(["fixed"], &path).unwrap();
        assert!(whitelist.allows("widget"));
        assert!(whitelist.allows("fixed"));

        std::fs::write(&path, "packages = [\"gadget\"]\n").unwrap();
        assert_eq!(whitelist.reload().unwrap(), 2);
        assert!(!whitelist.allows("widget"));
        assert!(whitelist.allows("gadget"));
        assert!(whitelist.allows("fixed"));
    }

    #[test]
    fn invalid_file_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.toml");
        std::fs::write(&path, "packages = [\"widget\"]\n").unwrap();
        let whitelist = Whitelist::with_file(Vec::<String>::new(), &path).unwrap();

        std::fs::write(&path, "packages = 42\n").unwrap();
        assert!(matches!(whitelist.reload(), Err(FeedError::Config(_))));
        assert!(whitelist.allows("widget"));
    }

    #[test]
    fn missing_file_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let whitelist = Whitelist::with_file(["widget"], dir.path().join("absent.toml")).unwrap();
        assert_eq!(whitelist.snapshot().len(), 1);
    }
}
