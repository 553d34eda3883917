// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds [`Package`] values from installed component metadata.

use std::path::Path;

use pressfeed_core::{FeedError, Package, PackageId, PackageKind, VersionParser};
use pressfeed_release::ReleaseManager;
use tracing::warn;

use crate::headers::ComponentHeaders;

/// Turns a component directory plus its headers into an immutable package.
///
/// The installed version becomes the live release; previously archived
/// versions found by the release manager are added as historical releases.
#[derive(Debug, Clone)]
pub struct PackageFactory {
    vendor: String,
    parser: VersionParser,
    releases: Option<ReleaseManager>,
}

impl PackageFactory {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            parser: VersionParser::new(),
            releases: None,
        }
    }

    /// Include archived releases from this manager's storage.
    pub fn with_release_manager(mut self, releases: ReleaseManager) -> Self {
        self.releases = Some(releases);
        self
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub async fn create(
        &self,
        kind: PackageKind,
        slug: &str,
        directory: &Path,
        headers: &ComponentHeaders,
    ) -> Result<Package, FeedError> {
        let id = PackageId::new(self.vendor.clone(), slug);
        let mut builder = Package::builder(id.clone(), kind, directory)
            .name(headers.name.clone())
            .description(headers.description.clone())
            .author(headers.author.clone())
            .author_uri(headers.author_uri.clone())
            .homepage(headers.uri.clone());

        if !headers.requires_php.is_empty() {
            builder = builder.require("php", format!(">={}", headers.requires_php));
        }

        match self.parser.parse(&headers.version) {
            Ok(version) => builder = builder.current_version(version),
            Err(e) => warn!(package = %id, error = %e, "installed version is not parseable, no current release"),
        }

        if let Some(releases) = &self.releases {
            for (version, locator) in releases.archived_releases(&id).await? {
                builder = builder.archived_release(version, locator);
            }
        }

        Ok(builder.build())
    }
}
