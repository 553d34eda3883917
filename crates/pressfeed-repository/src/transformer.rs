// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translates repository state into a Composer repository document.
//!
//! ```json
//! {"packages": {"acme/widget": {"1.2.0": {"name": "acme/widget", "version": "1.2.0", ...}}}}
//! ```
//!
//! Packages are keyed by full name in sorted order and versions follow the
//! package's release order (descending), so unchanged input renders to
//! identical bytes.

use std::collections::BTreeMap;

use pressfeed_core::{FeedError, Package, Release, Repository};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// Relative download prefix used when no absolute base URL is configured.
pub const DEFAULT_DOWNLOAD_BASE: &str = "/download";

/// Constraint added to every release so Composer installs into the right
/// WordPress directory.
const INSTALLERS_CONSTRAINT: (&str, &str) = ("composer/installers", "^1.0 || ^2.0");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedDocument {
    pub packages: BTreeMap<String, FeedPackage>,
}

impl FeedDocument {
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }
}

/// Releases of one package, serialized as a map keyed by version in
/// descending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPackage(pub Vec<FeedRelease>);

impl Serialize for FeedPackage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for release in &self.0 {
            map.serialize_entry(&release.version, release)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRelease {
    pub name: String,
    pub version: String,
    pub version_normalized: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<FeedAuthor>,
    pub dist: FeedDist,
    pub require: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub homepage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedDist {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Pure mapping from packages to the feed document.
#[derive(Debug, Clone)]
pub struct MetadataTransformer {
    download_base: String,
}

impl Default for MetadataTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_BASE)
    }
}

impl MetadataTransformer {
    /// `download_base` is either the relative default or an absolute URL;
    /// a trailing slash is ignored.
    pub fn new(download_base: impl Into<String>) -> Self {
        let base: String = download_base.into();
        Self {
            download_base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn download_base(&self) -> &str {
        &self.download_base
    }

    /// Download URL of one release: `<base>/<slug>/<version>`.
    pub fn download_url(&self, release: &Release) -> String {
        format!(
            "{}/{}/{}",
            self.download_base,
            release.package().slug(),
            release.version()
        )
    }

    pub async fn transform(&self, repository: &dyn Repository) -> Result<FeedDocument, FeedError> {
        let packages = repository.list_packages().await?;
        Ok(self.document(&packages))
    }

    /// Renders `transform` output as compact JSON bytes.
    pub async fn render(&self, repository: &dyn Repository) -> Result<Vec<u8>, FeedError> {
        let document = self.transform(repository).await?;
        serde_json::to_vec(&document)
            .map_err(|e| FeedError::Internal(format!("feed serialization failed: {e}")))
    }

    /// Packages without any release are omitted.
    pub fn document(&self, packages: &[Package]) -> FeedDocument {
        let packages = packages
            .iter()
            .filter(|package| !package.releases().is_empty())
            .map(|package| {
                let releases = package
                    .releases()
                    .iter()
                    .map(|release| self.release(package, release))
                    .collect();
                (package.id().name(), FeedPackage(releases))
            })
            .collect();
        FeedDocument { packages }
    }

    fn release(&self, package: &Package, release: &Release) -> FeedRelease {
        let mut require: BTreeMap<String, String> = package.requires().clone();
        let (installers, constraint) = INSTALLERS_CONSTRAINT;
        require
            .entry(installers.to_string())
            .or_insert_with(|| constraint.to_string());

        let authors = if package.author().is_empty() {
            Vec::new()
        } else {
            vec![FeedAuthor {
                name: package.author().to_string(),
                homepage: package.author_uri().to_string(),
            }]
        };

        FeedRelease {
            name: package.id().name(),
            version: release.version().to_string(),
            version_normalized: release.version().normalized(),
            kind: package.kind().composer_type().to_string(),
            description: package.description().to_string(),
            homepage: package.homepage().to_string(),
            authors,
            dist: FeedDist {
                kind: "zip".to_string(),
                url: self.download_url(release),
            },
            require,
        }
    }
}
