// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic zip archives of installed component directories.
//!
//! Entries are written in sorted order with a fixed timestamp and fixed
//! permissions, so the same source tree always produces the same bytes.
//! Every entry sits under a `<slug>/` prefix, matching the layout Composer
//! installers expect when they unpack a plugin or theme.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tracing::{debug, trace};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Names never included in an archive, at any depth.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", ".svn", ".DS_Store"];

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

/// One entry of a source tree, relative to its root with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    Dir { path: String },
    File { path: String, size: u64, mtime_nanos: u128 },
}

impl SourceEntry {
    pub fn path(&self) -> &str {
        match self {
            SourceEntry::Dir { path } | SourceEntry::File { path, .. } => path,
        }
    }
}

/// What a finished build wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub files: usize,
    pub dirs: usize,
    pub bytes: u64,
}

/// Builds zip archives from directory trees.
#[derive(Debug, Clone)]
pub struct Archiver {
    excludes: Vec<String>,
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDES.iter().map(|s| s.to_string()))
    }
}

impl Archiver {
    pub fn new(excludes: impl IntoIterator<Item = String>) -> Self {
        Self {
            excludes: excludes.into_iter().collect(),
        }
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excludes.iter().any(|e| e == name)
    }

    /// Walks `root` and returns its entries sorted by relative path.
    ///
    /// Symlinks and excluded names are skipped. Fails if `root` is not a
    /// readable directory or any sub-directory cannot be read.
    pub fn collect(&self, root: &Path) -> io::Result<Vec<SourceEntry>> {
        let meta = fs::metadata(root)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", root.display()),
            ));
        }
        let mut entries = Vec::new();
        self.walk(root, "", &mut entries)?;
        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    fn walk(&self, dir: &Path, prefix: &str, out: &mut Vec<SourceEntry>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                debug!(dir = %dir.display(), "skipping non-UTF-8 file name");
                continue;
            };
            if self.is_excluded(name) {
                continue;
            }

            let meta = fs::symlink_metadata(entry.path())?;
            let path = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };

            if meta.file_type().is_symlink() {
                trace!(path, "skipping symlink");
            } else if meta.is_dir() {
                out.push(SourceEntry::Dir { path: path.clone() });
                self.walk(&entry.path(), &path, out)?;
            } else if meta.is_file() {
                let mtime_nanos = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_nanos())
                    .unwrap_or(0);
                out.push(SourceEntry::File {
                    path,
                    size: meta.len(),
                    mtime_nanos,
                });
            }
        }
        Ok(())
    }

    /// SHA-256 over sorted relative paths, sizes and modification times.
    ///
    /// Changes whenever a file is added, removed, resized or touched.
    pub fn fingerprint(&self, root: &Path) -> io::Result<String> {
        let mut hasher = Sha256::new();
        for entry in self.collect(root)? {
            match entry {
                SourceEntry::Dir { path } => {
                    hasher.update(b"d\0");
                    hasher.update(path.as_bytes());
                }
                SourceEntry::File {
                    path,
                    size,
                    mtime_nanos,
                } => {
                    hasher.update(b"f\0");
                    hasher.update(path.as_bytes());
                    hasher.update(b"\0");
                    hasher.update(size.to_le_bytes());
                    hasher.update(mtime_nanos.to_le_bytes());
                }
            }
            hasher.update(b"\n");
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Zips `source` into a new file at `dest`, entries under `<prefix>/`.
    ///
    /// Blocking; run it on a blocking thread.
    pub fn build(&self, source: &Path, prefix: &str, dest: &Path) -> io::Result<ArchiveSummary> {
        let entries = self.collect(source)?;
        let file = File::create(dest)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));

        let mut summary = ArchiveSummary {
            files: 0,
            dirs: 1,
            bytes: 0,
        };
        zip.add_directory(format!("{prefix}/"), entry_options(DIR_MODE))?;

        for entry in &entries {
            match entry {
                SourceEntry::Dir { path } => {
                    zip.add_directory(format!("{prefix}/{path}/"), entry_options(DIR_MODE))?;
                    summary.dirs += 1;
                }
                SourceEntry::File { path, .. } => {
                    zip.start_file(format!("{prefix}/{path}"), entry_options(FILE_MODE))?;
                    let mut reader = File::open(source.join(path))?;
                    summary.bytes += io::copy(&mut reader, &mut zip)?;
                    summary.files += 1;
                }
            }
        }

        let mut writer = zip.finish()?;
        io::Write::flush(&mut writer)?;
        writer.get_ref().sync_all()?;
        debug!(
            source = %source.display(),
            files = summary.files,
            dirs = summary.dirs,
            "archive written"
        );
        Ok(summary)
    }
}

/// Fixed 1980-01-01 timestamp and fixed mode for every entry.
fn entry_options(mode: u32) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(mode)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "widget.php", "<?php\n/* Plugin Name: Widget */\n");
        write(root, "includes/class-widget.php", "<?php class Widget {}\n");
        write(root, "assets/css/widget.css", "body { color: red; }\n");
        write(root, ".git/HEAD", "ref: refs/heads/main\n");
        fs::create_dir_all(root.join("languages")).unwrap();
        dir
    }

    /// Relative path => contents (None for directories).
    fn tree(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
        fn visit(root: &Path, dir: &Path, out: &mut BTreeMap<String, Option<Vec<u8>>>) {
            for entry in fs::read_dir(dir).unwrap() {
                let entry = entry.unwrap();
                let path = entry.path();
                let rel = path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                if path.is_dir() {
                    out.insert(rel, None);
                    visit(root, &path, out);
                } else {
                    out.insert(rel, Some(fs::read(&path).unwrap()));
                }
            }
        }
        let mut out = BTreeMap::new();
        visit(root, root, &mut out);
        out
    }

    fn extract(archive: &Path) -> tempfile::TempDir {
        let out = tempfile::tempdir().unwrap();
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        zip.extract(out.path()).unwrap();
        out
    }

    #[test]
    fn collect_is_sorted_and_skips_excludes() {
        let src = fixture();
        let paths: Vec<String> = Archiver::default()
            .collect(src.path())
            .unwrap()
            .iter()
            .map(|e| e.path().to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "assets",
                "assets/css",
                "assets/css/widget.css",
                "includes",
                "includes/class-widget.php",
                "languages",
                "widget.php",
            ]
        );
    }

    #[test]
    fn archive_expands_to_source_tree() {
        let src = fixture();
        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("widget-1.0.0.zip");

        let summary = Archiver::default().build(src.path(), "widget", &dest).unwrap();
        assert_eq!(summary.files, 3);

        let extracted = extract(&dest);
        let mut expected = tree(src.path());
        expected.retain(|path, _| !path.starts_with(".git"));
        assert_eq!(tree(&extracted.path().join("widget")), expected);
    }

    #[test]
    fn archives_are_deterministic() {
        let src = fixture();
        let out = tempfile::tempdir().unwrap();
        let first = out.path().join("a.zip");
        let second = out.path().join("b.zip");
        let archiver = Archiver::default();

        archiver.build(src.path(), "widget", &first).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        write(src.path(), "widget.php", "<?php\n/* Plugin Name: Widget */\n");
        archiver.build(src.path(), "widget", &second).unwrap();

        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let src = fixture();
        let archiver = Archiver::default();
        let before = archiver.fingerprint(src.path()).unwrap();
        assert_eq!(before, archiver.fingerprint(src.path()).unwrap());
        assert_eq!(before.len(), 64);

        write(src.path(), "includes/new.php", "<?php\n");
        assert_ne!(before, archiver.fingerprint(src.path()).unwrap());
    }

    #[test]
    fn excluded_files_do_not_affect_fingerprint() {
        let src = fixture();
        let archiver = Archiver::default();
        let before = archiver.fingerprint(src.path()).unwrap();
        write(src.path(), ".git/ORIG_HEAD", "abc\n");
        assert_eq!(before, archiver.fingerprint(src.path()).unwrap());
    }

    #[test]
    fn custom_excludes() {
        let src = fixture();
        let archiver = Archiver::new(vec!["assets".to_string()]);
        let paths: Vec<String> = archiver
            .collect(src.path())
            .unwrap()
            .iter()
            .map(|e| e.path().to_string())
            .collect();
        assert!(paths.iter().all(|p| !p.starts_with("assets")));
        assert!(paths.iter().any(|p| p.starts_with(".git")));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let src = fixture();
        std::os::unix::fs::symlink("/etc/hostname", src.path().join("host")).unwrap();
        let paths: Vec<String> = Archiver::default()
            .collect(src.path())
            .unwrap()
            .iter()
            .map(|e| e.path().to_string())
            .collect();
        assert!(!paths.contains(&"host".to_string()));
    }

    #[test]
    fn missing_source_fails() {
        let out = tempfile::tempdir().unwrap();
        let missing = PathBuf::from("/nonexistent/pressfeed/widget");
        let err = Archiver::default()
            .build(&missing, "widget", &out.path().join("x.zip"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!out.path().join("x.zip").exists());
    }
}
