// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage trait for the archive byte store.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FeedError;
use crate::types::Locator;

/// An exclusive lock on a storage key, released when dropped.
pub trait StorageLock: Send + Sync + Debug {}

/// A sandboxed byte store keyed by relative paths.
///
/// Every key and locator is validated against the store's root; anything
/// that would resolve outside it fails with [`FeedError::InvalidLocator`]
/// before the filesystem is touched.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Deterministic locator for a key. Distinct keys never collide.
    fn path_for(&self, key: &str) -> Result<Locator, FeedError>;

    /// Absolute local path of a locator, for streaming responses.
    fn local_path(&self, locator: &Locator) -> Result<PathBuf, FeedError>;

    /// Writes bytes atomically under `key`.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<Locator, FeedError>;

    /// Moves a staged file into place under `key` with an atomic rename.
    async fn put_file(&self, key: &str, staged: &Path) -> Result<Locator, FeedError>;

    /// Reads the whole object. Missing objects yield [`FeedError::StorageNotFound`].
    async fn get(&self, locator: &Locator) -> Result<Vec<u8>, FeedError>;

    async fn exists(&self, locator: &Locator) -> Result<bool, FeedError>;

    /// Lists the files directly under a directory prefix, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<Locator>, FeedError>;

    async fn delete(&self, locator: &Locator) -> Result<(), FeedError>;

    /// A fresh temporary path on the same filesystem as the final location of `key`.
    async fn staging_path(&self, key: &str) -> Result<PathBuf, FeedError>;

    /// Takes an exclusive lock on `locator`, waiting at most `timeout`.
    async fn lock(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Box<dyn StorageLock>, FeedError>;
}
