// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolves `(package, version)` pairs to archive files.
//!
//! Live releases are zipped on demand and cached in [`Storage`] under
//! `<slug>/<slug>-<version>.zip`, next to a `.source` sidecar holding the
//! fingerprint of the tree the archive was built from. A cached archive is
//! served as long as the fingerprint still matches.
//!
//! Concurrent requests for the same key collapse into one build: an
//! in-process mutex per key, then the storage lock for other processes.
//! The build itself runs in a spawned task that owns the mutex guard, so a
//! dropped request does not abort it.
//!
//! A listing can be older than the files on disk. With an
//! [`InstalledVersion`] check configured, the manager re-reads the version a
//! live directory declares before building and never writes an archive for
//! one version from the tree of another.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use pressfeed_core::{
    FeedError, Locator, Package, PackageId, PackageKind, Release, ReleaseSource, Storage,
    Version, VersionParser,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::archiver::Archiver;

/// Suffix of the fingerprint sidecar stored next to each built archive.
const SOURCE_SUFFIX: &str = ".source";

/// Timeouts bounding every wait in the release manager.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseManagerConfig {
    /// How long to wait for another build of the same key to finish.
    pub lock_timeout: Duration,
    /// How long a caller waits for its own build.
    pub build_timeout: Duration,
}

impl Default for ReleaseManagerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(30),
            build_timeout: Duration::from_secs(120),
        }
    }
}

/// A complete archive ready to be streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub locator: Locator,
    pub path: PathBuf,
    pub size: u64,
    /// Download file name, `<slug>-<version>.zip`.
    pub file_name: String,
    /// The live directory now holds another version; this is the archive
    /// kept from before, and the caller's listing is stale.
    pub superseded: bool,
}

/// Reads the version a live component directory declares right now.
pub trait InstalledVersion: Send + Sync {
    /// `Ok(None)` when the directory declares no parseable version.
    fn installed_version(&self, kind: PackageKind, dir: &Path) -> io::Result<Option<Version>>;
}

/// Builds, caches and looks up release archives.
#[derive(Clone)]
pub struct ReleaseManager {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn Storage>,
    archiver: Archiver,
    config: ReleaseManagerConfig,
    installed: Option<Arc<dyn InstalledVersion>>,
    builds: DashMap<String, Arc<Mutex<()>>>,
    build_count: AtomicU64,
}

impl std::fmt::Debug for ReleaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseManager")
            .field("config", &self.inner.config)
            .field("build_count", &self.build_count())
            .finish_non_exhaustive()
    }
}

impl ReleaseManager {
    pub fn new(storage: Arc<dyn Storage>, archiver: Archiver, config: ReleaseManagerConfig) -> Self {
        Self::assemble(storage, archiver, config, None)
    }

    /// Like [`ReleaseManager::new`], confirming through `check` that a live
    /// directory still holds the requested version before building from it.
    pub fn with_version_check(
        storage: Arc<dyn Storage>,
        archiver: Archiver,
        config: ReleaseManagerConfig,
        check: Arc<dyn InstalledVersion>,
    ) -> Self {
        Self::assemble(storage, archiver, config, Some(check))
    }

    fn assemble(
        storage: Arc<dyn Storage>,
        archiver: Archiver,
        config: ReleaseManagerConfig,
        installed: Option<Arc<dyn InstalledVersion>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                archiver,
                config,
                installed,
                builds: DashMap::new(),
                build_count: AtomicU64::new(0),
            }),
        }
    }

    /// Number of archives this manager has built since it was created.
    pub fn build_count(&self) -> u64 {
        self.inner.build_count.load(Ordering::SeqCst)
    }

    /// Returns the archive for `version` of `package`.
    ///
    /// Versions compare by value, so `1.2` finds the `1.2.0` release.
    ///
    /// When the live directory of the requested release has moved on to
    /// another version, nothing is built: the archive already stored for the
    /// requested version is returned with [`Archive::superseded`] set, or
    /// [`FeedError::ReleaseNotFound`] when there is none.
    #[instrument(skip_all, fields(package = %package.id(), version = %version))]
    pub async fn get_archive(&self, package: &Package, version: &Version) -> Result<Archive, FeedError> {
        let release = package
            .release(version)
            .ok_or_else(|| FeedError::ReleaseNotFound {
                slug: package.slug().to_string(),
                version: version.to_string(),
            })?;

        match release.source() {
            ReleaseSource::Live(dir) => self.live_archive(package.kind(), release, dir).await,
            ReleaseSource::Archived(locator) => self.inner.stored_archive(release, locator).await,
        }
    }

    /// Builds (or confirms) the archive of the installed version.
    ///
    /// Returns `None` when the package has no parseable installed version.
    pub async fn archive_current(&self, package: &Package) -> Result<Option<Archive>, FeedError> {
        match package.installed_version() {
            Some(version) => self.get_archive(package, version).await.map(Some),
            None => Ok(None),
        }
    }

    /// Versions previously archived in storage for `package`, descending.
    ///
    /// Files whose names do not parse as `<slug>-<version>.zip` are skipped.
    pub async fn archived_releases(&self, package: &PackageId) -> Result<Vec<(Version, Locator)>, FeedError> {
        let slug = package.slug();
        let prefix = format!("{slug}-");
        let parser = VersionParser::new();

        let mut found = Vec::new();
        for locator in self.inner.storage.list(slug).await? {
            let Some(raw) = locator
                .file_name()
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".zip"))
            else {
                continue;
            };
            match parser.parse(raw) {
                Ok(version) => found.push((version, locator)),
                Err(e) => warn!(package = %package, file = locator.file_name(), error = %e, "skipping archive with invalid version"),
            }
        }
        found.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(found)
    }

    async fn live_archive(&self, kind: PackageKind, release: &Release, dir: &Path) -> Result<Archive, FeedError> {
        let key = archive_key(release);
        let locator = self.inner.storage.path_for(&key)?;

        if let Some(installed) = self.inner.replaced_by(kind, release, dir).await? {
            return self.inner.superseded(release, locator, &installed).await;
        }

        let fingerprint = self.inner.fingerprint(release, dir).await?;
        if self.inner.is_fresh(&locator, &fingerprint).await? {
            debug!(key = %key, "serving cached archive");
            pressfeed_prometheus::record_archive_build("cached");
            return self.inner.describe(release, locator).await;
        }

        let mutex = self
            .inner
            .builds
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = match tokio::time::timeout(self.inner.config.lock_timeout, mutex.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!(key = %key, "timed out waiting for in-flight build");
                pressfeed_prometheus::record_archive_build("busy");
                return Err(FeedError::Busy { key });
            }
        };

        let inner = Arc::clone(&self.inner);
        let release = release.clone();
        let dir = dir.to_path_buf();
        let task = tokio::spawn(async move { inner.build_locked(guard, kind, &release, &dir).await });

        let build_timeout = self.inner.config.build_timeout;
        match tokio::time::timeout(build_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(FeedError::Internal(format!("archive build task failed: {join}"))),
            Err(_) => {
                warn!(key = %key, ?build_timeout, "archive build still running, giving up on waiting");
                pressfeed_prometheus::record_archive_build("timeout");
                Err(FeedError::Timeout {
                    duration: build_timeout,
                })
            }
        }
    }
}

impl Inner {
    async fn fingerprint(&self, release: &Release, dir: &Path) -> Result<String, FeedError> {
        let archiver = self.archiver.clone();
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || archiver.fingerprint(&dir))
            .await
            .map_err(|e| FeedError::Internal(format!("fingerprint task failed: {e}")))?
            .map_err(|e| build_failed(release, "source directory unreadable", e))
    }

    async fn is_fresh(&self, locator: &Locator, fingerprint: &str) -> Result<bool, FeedError> {
        if !self.storage.exists(locator).await? {
            return Ok(false);
        }
        let sidecar = self.storage.path_for(&format!("{locator}{SOURCE_SUFFIX}"))?;
        match self.storage.get(&sidecar).await {
            Ok(bytes) => Ok(bytes == fingerprint.as_bytes()),
            Err(FeedError::StorageNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn describe(&self, release: &Release, locator: Locator) -> Result<Archive, FeedError> {
        let path = self.storage.local_path(&locator)?;
        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => {
                return Err(FeedError::ArchiveNotFound {
                    slug: release.package().slug().to_string(),
                    version: release.version().to_string(),
                });
            }
        };
        Ok(Archive {
            locator,
            path,
            size,
            file_name: release.file_name(),
            superseded: false,
        })
    }

    /// The version now declared in `dir`, when it is no longer `release`'s.
    async fn replaced_by(&self, kind: PackageKind, release: &Release, dir: &Path) -> Result<Option<String>, FeedError> {
        let Some(check) = self.installed.clone() else {
            return Ok(None);
        };
        let dir = dir.to_path_buf();
        let read = tokio::task::spawn_blocking(move || check.installed_version(kind, &dir))
            .await
            .map_err(|e| FeedError::Internal(format!("version check task failed: {e}")))?;
        match read {
            Ok(Some(installed)) if installed == *release.version() => Ok(None),
            Ok(Some(installed)) => Ok(Some(installed.to_string())),
            Ok(None) => Ok(Some("none".to_string())),
            // The fingerprint step reports an unreadable directory.
            Err(e) => {
                debug!(error = %e, "installed version unreadable");
                Ok(None)
            }
        }
    }

    /// Hands back what is stored for a live release whose directory now
    /// declares `installed`, without building over it.
    async fn superseded(&self, release: &Release, locator: Locator, installed: &str) -> Result<Archive, FeedError> {
        warn!(
            key = %locator,
            listed = %release.version(),
            installed,
            "installed version changed since listing, not building"
        );
        pressfeed_prometheus::record_archive_build("superseded");
        if !self.storage.exists(&locator).await? {
            return Err(FeedError::ReleaseNotFound {
                slug: release.package().slug().to_string(),
                version: release.version().to_string(),
            });
        }
        let mut archive = self.describe(release, locator).await?;
        archive.superseded = true;
        Ok(archive)
    }

    async fn stored_archive(&self, release: &Release, locator: &Locator) -> Result<Archive, FeedError> {
        if !self.storage.exists(locator).await? {
            return Err(FeedError::ArchiveNotFound {
                slug: release.package().slug().to_string(),
                version: release.version().to_string(),
            });
        }
        self.describe(release, locator.clone()).await
    }

    /// Runs with the per-key mutex held; releases it and prunes the map entry
    /// when done.
    async fn build_locked(
        self: Arc<Self>,
        guard: OwnedMutexGuard<()>,
        kind: PackageKind,
        release: &Release,
        dir: &Path,
    ) -> Result<Archive, FeedError> {
        let key = archive_key(release);
        let result = self.build(kind, release, dir, &key).await;
        drop(guard);
        self.builds
            .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
        result
    }

    async fn build(&self, kind: PackageKind, release: &Release, dir: &Path, key: &str) -> Result<Archive, FeedError> {
        let locator = self.storage.path_for(key)?;
        let _file_lock = self.storage.lock(&locator, self.config.lock_timeout).await?;

        // The directory may have been upgraded while we waited for the lock.
        if let Some(installed) = self.replaced_by(kind, release, dir).await? {
            return self.superseded(release, locator, &installed).await;
        }

        // Another caller or process may have finished while we waited.
        let fingerprint = self.fingerprint(release, dir).await?;
        if self.is_fresh(&locator, &fingerprint).await? {
            debug!(key, "archive built by another caller");
            pressfeed_prometheus::record_archive_build("cached");
            return self.describe(release, locator).await;
        }

        let started = Instant::now();
        let staged = self.storage.staging_path(key).await?;
        let archiver = self.archiver.clone();
        let prefix = release.package().slug().to_string();
        let source = dir.to_path_buf();
        let target = staged.clone();
        let built = tokio::task::spawn_blocking(move || archiver.build(&source, &prefix, &target))
            .await
            .map_err(|e| FeedError::Internal(format!("archive task failed: {e}")))?;

        let summary = match built {
            Ok(summary) => summary,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staged).await;
                pressfeed_prometheus::record_archive_build("failed");
                return Err(build_failed(release, "could not write archive", e));
            }
        };

        let locator = self.storage.put_file(key, &staged).await.inspect_err(|_| {
            pressfeed_prometheus::record_archive_build("failed");
        })?;
        self.storage
            .put(&format!("{key}{SOURCE_SUFFIX}"), fingerprint.as_bytes())
            .await?;

        self.build_count.fetch_add(1, Ordering::SeqCst);
        let elapsed = started.elapsed();
        pressfeed_prometheus::record_archive_build("built");
        pressfeed_prometheus::record_archive_build_duration(elapsed.as_secs_f64());
        info!(
            key,
            files = summary.files,
            bytes = summary.bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            "archive built"
        );
        self.describe(release, locator).await
    }
}

/// Storage key of a release archive: `<slug>/<slug>-<version>.zip`.
pub fn archive_key(release: &Release) -> String {
    format!("{}/{}", release.package().slug(), release.file_name())
}

fn build_failed(release: &Release, message: &str, err: std::io::Error) -> FeedError {
    FeedError::ArchiveBuildFailed {
        slug: release.package().slug().to_string(),
        version: release.version().to_string(),
        message: format!("{message}: {err}"),
        source: Some(Box::new(err)),
    }
}
