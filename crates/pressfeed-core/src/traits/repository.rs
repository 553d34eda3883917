// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository trait: a source of known packages.

use async_trait::async_trait;

use crate::error::FeedError;
use crate::types::Package;

/// Supplies the set of known packages, each with its available releases.
///
/// Implementations compose by wrapping: a whitelist over a union over
/// caches over installed sources.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stable identifier of this repository, used in logs and cache keys.
    fn name(&self) -> &str;

    /// Returns every package, sorted by package id.
    ///
    /// Either the complete set or an error; never a partial listing.
    async fn list_packages(&self) -> Result<Vec<Package>, FeedError>;

    /// Looks up a single package by slug or `vendor/slug`.
    async fn get_package(&self, slug: &str) -> Result<Option<Package>, FeedError> {
        Ok(self
            .list_packages()
            .await?
            .into_iter()
            .find(|package| package.matches(slug)))
    }

    /// Returns true if a package with this slug exists.
    async fn has_package(&self, slug: &str) -> Result<bool, FeedError> {
        Ok(self.get_package(slug).await?.is_some())
    }

    /// Drops memoized listings so the next read looks at the sources again.
    ///
    /// Wrappers forward to what they wrap; uncached repositories ignore it.
    fn invalidate(&self) {}
}
