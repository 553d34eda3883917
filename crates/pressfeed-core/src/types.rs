// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Package, release and storage locator types shared by every pressfeed crate.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::FeedError;
use crate::version::Version;

/// The kind of installed component a package was built from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Plugin,
    Theme,
}

impl PackageKind {
    /// Composer package type, understood by `composer/installers`.
    pub fn composer_type(&self) -> &'static str {
        match self {
            PackageKind::Plugin => "wordpress-plugin",
            PackageKind::Theme => "wordpress-theme",
        }
    }
}

/// Package identity: `vendor/slug`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    vendor: String,
    slug: String,
}

impl PackageId {
    pub fn new(vendor: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            slug: slug.into(),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Full Composer package name, `vendor/slug`.
    pub fn name(&self) -> String {
        format!("{}/{}", self.vendor, self.slug)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vendor, self.slug)
    }
}

/// A validated path relative to a storage root.
///
/// Segments are separated by `/` and may not be empty, `.` or `..`;
/// backslashes, NUL bytes and absolute paths are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(String);

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        let invalid = |reason: &str| FeedError::InvalidLocator {
            locator: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("empty locator"));
        }
        if raw.starts_with('/') || Path::new(raw).is_absolute() {
            return Err(invalid("absolute paths are not allowed"));
        }
        if raw.contains('\\') || raw.contains('\0') {
            return Err(invalid("backslashes and NUL bytes are not allowed"));
        }
        for segment in raw.split('/') {
            match segment {
                "" => return Err(invalid("empty path segment")),
                "." | ".." => return Err(invalid("relative path segment")),
                _ if segment.contains(':') => return Err(invalid("drive or scheme prefix")),
                _ => {}
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a release's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSource {
    /// The live installed directory; archives are built on demand.
    Live(PathBuf),
    /// A previously built artifact in storage.
    Archived(Locator),
}

/// A specific version of a package plus the location of its source bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    package: PackageId,
    version: Version,
    source: ReleaseSource,
}

impl Release {
    pub fn new(package: PackageId, version: Version, source: ReleaseSource) -> Self {
        Self {
            package,
            version,
            source,
        }
    }

    pub fn package(&self) -> &PackageId {
        &self.package
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn source(&self) -> &ReleaseSource {
        &self.source
    }

    pub fn is_live(&self) -> bool {
        matches!(self.source, ReleaseSource::Live(_))
    }

    /// Archive file name: `<slug>-<version>.zip`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.zip", self.package.slug(), self.version)
    }
}

/// An installable component with its known releases.
///
/// Built once through [`PackageBuilder`]; rebuilt, never mutated, when the
/// installed state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    id: PackageId,
    kind: PackageKind,
    name: String,
    description: String,
    author: String,
    author_uri: String,
    homepage: String,
    directory: PathBuf,
    requires: BTreeMap<String, String>,
    releases: Vec<Release>,
}

impl Package {
    pub fn builder(id: PackageId, kind: PackageKind, directory: impl Into<PathBuf>) -> PackageBuilder {
        PackageBuilder {
            package: Package {
                id,
                kind,
                name: String::new(),
                description: String::new(),
                author: String::new(),
                author_uri: String::new(),
                homepage: String::new(),
                directory: directory.into(),
                requires: BTreeMap::new(),
                releases: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn slug(&self) -> &str {
        self.id.slug()
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Display name; falls back to the slug when the header had none.
    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            self.id.slug()
        } else {
            &self.name
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn author_uri(&self) -> &str {
        &self.author_uri
    }

    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Declared dependency constraints (`php` => `>=7.4`).
    pub fn requires(&self) -> &BTreeMap<String, String> {
        &self.requires
    }

    /// All releases, strictly descending by version.
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// The release built from the live installed directory, if its version parsed.
    pub fn current_release(&self) -> Option<&Release> {
        self.releases.iter().find(|r| r.is_live())
    }

    pub fn installed_version(&self) -> Option<&Version> {
        self.current_release().map(Release::version)
    }

    pub fn release(&self, version: &Version) -> Option<&Release> {
        self.releases.iter().find(|r| r.version() == version)
    }

    /// Matches either the bare slug or the full `vendor/slug` name.
    pub fn matches(&self, name: &str) -> bool {
        match name.split_once('/') {
            Some((vendor, slug)) => vendor == self.id.vendor() && slug == self.id.slug(),
            None => name == self.id.slug(),
        }
    }
}

/// Builder enforcing the release-ordering invariant of [`Package`].
#[derive(Debug)]
pub struct PackageBuilder {
    package: Package,
}

impl PackageBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.package.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.package.description = description.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.package.author = author.into();
        self
    }

    pub fn author_uri(mut self, uri: impl Into<String>) -> Self {
        self.package.author_uri = uri.into();
        self
    }

    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.package.homepage = homepage.into();
        self
    }

    pub fn require(mut self, dependency: impl Into<String>, constraint: impl Into<String>) -> Self {
        self.package.requires.insert(dependency.into(), constraint.into());
        self
    }

    /// Adds the release served from the live installed directory.
    pub fn current_version(mut self, version: Version) -> Self {
        let release = Release::new(
            self.package.id.clone(),
            version,
            ReleaseSource::Live(self.package.directory.clone()),
        );
        self.package.releases.push(release);
        self
    }

    /// Adds a previously archived release.
    pub fn archived_release(mut self, version: Version, locator: Locator) -> Self {
        let release = Release::new(self.package.id.clone(), version, ReleaseSource::Archived(locator));
        self.package.releases.push(release);
        self
    }

    /// Sorts releases descending and drops duplicate versions; a live
    /// release wins over an archived one with the same version.
    pub fn build(mut self) -> Package {
        let releases = &mut self.package.releases;
        releases.sort_by(|a, b| {
            b.version()
                .cmp(a.version())
                .then_with(|| b.is_live().cmp(&a.is_live()))
        });
        releases.dedup_by(|later, earlier| later.version() == earlier.version());
        self.package
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Owning user of the credential.
    pub user: String,
    /// Identifier of the strategy that authenticated the request.
    pub strategy: String,
}

/// Definitive outcome of the authentication chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Identity),
    Denied { reason: String },
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }
}
