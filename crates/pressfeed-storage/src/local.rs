// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local filesystem implementation of [`Storage`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use pressfeed_core::{FeedError, Locator, Storage, StorageLock};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::lock::FileLock;

/// Directory under the root holding staged writes.
const STAGING_DIR: &str = ".tmp";

/// A byte store rooted at a single directory.
///
/// Objects live at `<root>/<locator>`. Writes are staged in `<root>/.tmp`
/// and renamed into place, so a reader never observes a partial object.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Opens (and creates if needed) a storage root.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, FeedError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(STAGING_DIR)).map_err(FeedError::storage)?;
        let root = root.canonicalize().map_err(FeedError::storage)?;
        debug!(root = %root.display(), "local storage opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, locator: &Locator) -> Result<PathBuf, FeedError> {
        let path = self.root.join(locator.as_str());
        self.ensure_within_root(locator, &path)?;
        Ok(path)
    }

    /// Rejects paths whose existing ancestors resolve (through symlinks)
    /// outside the root.
    fn ensure_within_root(&self, locator: &Locator, path: &Path) -> Result<(), FeedError> {
        let mut probe = path;
        loop {
            match probe.canonicalize() {
                Ok(resolved) => {
                    if resolved.starts_with(&self.root) {
                        return Ok(());
                    }
                    return Err(FeedError::InvalidLocator {
                        locator: locator.to_string(),
                        reason: "resolves outside the storage root".to_string(),
                    });
                }
                Err(_) => match probe.parent() {
                    Some(parent) => probe = parent,
                    None => return Ok(()),
                },
            }
        }
    }

    async fn ensure_parent(path: &Path) -> Result<(), FeedError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(FeedError::storage)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn path_for(&self, key: &str) -> Result<Locator, FeedError> {
        let locator = Locator::parse(key)?;
        if locator.as_str() == STAGING_DIR || locator.as_str().starts_with(".tmp/") {
            return Err(FeedError::InvalidLocator {
                locator: key.to_string(),
                reason: "reserved staging directory".to_string(),
            });
        }
        Ok(locator)
    }

    fn local_path(&self, locator: &Locator) -> Result<PathBuf, FeedError> {
        self.resolve(locator)
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<Locator, FeedError> {
        let staged = self.staging_path(key).await?;
        let mut file = tokio::fs::File::create(&staged)
            .await
            .map_err(FeedError::storage)?;
        let written = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;
        drop(file);
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(FeedError::storage(e));
        }
        self.put_file(key, &staged).await
    }

    async fn put_file(&self, key: &str, staged: &Path) -> Result<Locator, FeedError> {
        let locator = self.path_for(key)?;
        let dest = self.resolve(&locator)?;
        Self::ensure_parent(&dest).await?;
        if let Err(e) = tokio::fs::rename(staged, &dest).await {
            let _ = tokio::fs::remove_file(staged).await;
            return Err(FeedError::storage(e));
        }
        debug!(locator = %locator, "object stored");
        Ok(locator)
    }

    async fn get(&self, locator: &Locator) -> Result<Vec<u8>, FeedError> {
        let path = self.resolve(locator)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FeedError::StorageNotFound {
                locator: locator.to_string(),
            },
            _ => FeedError::storage(e),
        })
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, FeedError> {
        let path = self.resolve(locator)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FeedError::storage(e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Locator>, FeedError> {
        let dir_locator = self.path_for(prefix)?;
        let dir = self.resolve(&dir_locator)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FeedError::storage(e)),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(FeedError::storage)? {
            let file_type = entry.file_type().await.map_err(FeedError::storage)?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            found.push(Locator::parse(&format!("{dir_locator}/{name}"))?);
        }
        found.sort();
        Ok(found)
    }

    async fn delete(&self, locator: &Locator) -> Result<(), FeedError> {
        let path = self.resolve(locator)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FeedError::storage(e)),
        }
    }

    async fn staging_path(&self, key: &str) -> Result<PathBuf, FeedError> {
        let locator = self.path_for(key)?;
        let staging = self.root.join(STAGING_DIR);
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(FeedError::storage)?;
        Ok(staging.join(format!(
            "{}.{}.part",
            locator.file_name(),
            uuid::Uuid::new_v4()
        )))
    }

    async fn lock(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Box<dyn StorageLock>, FeedError> {
        let path = self.resolve(locator)?;
        let lock_path = path.with_file_name(format!(".{}.lock", locator.file_name()));
        let lock = tokio::task::spawn_blocking(move || FileLock::acquire(&lock_path, timeout))
            .await
            .map_err(|e| FeedError::Internal(format!("lock task failed: {e}")))??;
        Ok(Box::new(lock))
    }
}
