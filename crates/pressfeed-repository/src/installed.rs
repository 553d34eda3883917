// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repositories backed by the host's installed plugin and theme directories.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use pressfeed_core::{FeedError, Package, PackageKind, Repository, Version, VersionParser};
use pressfeed_release::InstalledVersion;
use tracing::{debug, instrument};

use crate::factory::PackageFactory;
use crate::headers::{ComponentHeaders, read_headers};

/// One installed component discovered on disk.
#[derive(Debug, Clone)]
struct Component {
    slug: String,
    directory: PathBuf,
    headers: ComponentHeaders,
}

/// Lists the components installed under one root directory.
///
/// A plugin is a sub-directory with a top-level `*.php` file declaring
/// `Plugin Name:`; a theme is a sub-directory whose `style.css` declares
/// `Theme Name:`. Other entries are skipped. Any I/O failure fails the whole
/// listing with [`FeedError::SourceUnavailable`].
pub struct InstalledSource {
    name: String,
    kind: PackageKind,
    root: PathBuf,
    factory: Arc<PackageFactory>,
}

impl InstalledSource {
    pub fn new(kind: PackageKind, root: impl Into<PathBuf>, factory: Arc<PackageFactory>) -> Self {
        Self {
            name: format!("installed-{kind}s"),
            kind,
            root: root.into(),
            factory,
        }
    }

    pub fn plugins(root: impl Into<PathBuf>, factory: Arc<PackageFactory>) -> Self {
        Self::new(PackageKind::Plugin, root, factory)
    }

    pub fn themes(root: impl Into<PathBuf>, factory: Arc<PackageFactory>) -> Self {
        Self::new(PackageKind::Theme, root, factory)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unavailable(&self, message: String, err: io::Error) -> FeedError {
        FeedError::SourceUnavailable {
            source_name: self.name.clone(),
            message,
            source: Some(Box::new(err)),
        }
    }
}

#[async_trait]
impl Repository for InstalledSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source = %self.name, root = %self.root.display()))]
    async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
        let kind = self.kind;
        let root = self.root.clone();
        let components = tokio::task::spawn_blocking(move || scan(kind, &root))
            .await
            .map_err(|e| FeedError::Internal(format!("scan task failed: {e}")))?
            .map_err(|(path, err)| self.unavailable(format!("cannot read {}", path.display()), err))?;

        let mut packages = Vec::with_capacity(components.len());
        for component in components {
            let package = self
                .factory
                .create(kind, &component.slug, &component.directory, &component.headers)
                .await?;
            packages.push(package);
        }
        packages.sort_by(|a, b| a.id().cmp(b.id()));
        debug!(count = packages.len(), "installed components listed");
        Ok(packages)
    }
}

/// Reads the version a component directory declares, locating its header
/// file the same way a listing does.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderVersion;

impl InstalledVersion for HeaderVersion {
    fn installed_version(&self, kind: PackageKind, dir: &Path) -> io::Result<Option<Version>> {
        let headers = match kind {
            PackageKind::Plugin => plugin_headers(dir),
            PackageKind::Theme => theme_headers(dir),
        }
        .map_err(|(_, e)| e)?;
        Ok(headers.and_then(|headers| VersionParser::new().parse(&headers.version).ok()))
    }
}

type ScanError = (PathBuf, io::Error);

fn scan(kind: PackageKind, root: &Path) -> Result<Vec<Component>, ScanError> {
    let at = |path: &Path| {
        let path = path.to_path_buf();
        move |e: io::Error| (path, e)
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).map_err(at(root))? {
        let entry = entry.map_err(at(root))?;
        let path = entry.path();
        // Follows symlinks: hosts commonly symlink plugins into place.
        if !path.is_dir() {
            continue;
        }
        let Some(slug) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if slug.starts_with('.') {
            continue;
        }
        dirs.push((slug, path));
    }
    dirs.sort();

    let mut components = Vec::new();
    for (slug, directory) in dirs {
        let headers = match kind {
            PackageKind::Plugin => plugin_headers(&directory)?,
            PackageKind::Theme => theme_headers(&directory)?,
        };
        match headers {
            Some(headers) => components.push(Component {
                slug,
                directory,
                headers,
            }),
            None => debug!(slug, "directory has no component header, skipping"),
        }
    }
    Ok(components)
}

/// First top-level `*.php` file (by name) with a `Plugin Name:` header.
fn plugin_headers(dir: &Path) -> Result<Option<ComponentHeaders>, ScanError> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| (dir.to_path_buf(), e))? {
        let path = entry.map_err(|e| (dir.to_path_buf(), e))?.path();
        if path.extension().is_some_and(|ext| ext == "php") && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    for path in candidates {
        if let Some(headers) = read_headers(&path, PackageKind::Plugin).map_err(|e| (path.clone(), e))? {
            return Ok(Some(headers));
        }
    }
    Ok(None)
}

fn theme_headers(dir: &Path) -> Result<Option<ComponentHeaders>, ScanError> {
    let stylesheet = dir.join("style.css");
    if !stylesheet.is_file() {
        return Ok(None);
    }
    read_headers(&stylesheet, PackageKind::Theme).map_err(|e| (stylesheet, e))
}
