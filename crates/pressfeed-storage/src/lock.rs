// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory file locks with a bounded wait.
//!
//! Locks are taken on a hidden sibling `.<file>.lock` so the artifact itself
//! can be replaced by rename while the lock is held. The lock is advisory: it
//! coordinates pressfeed processes sharing a cache directory.
//!
//! On Unix the lock file is unlinked before it is released. A waiter that
//! then wins the lock on the unlinked file sees that the path no longer
//! names it and opens the path again.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use pressfeed_core::{FeedError, StorageLock};
use tracing::{debug, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// An exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Blocks until the lock at `path` is acquired or `timeout` elapses.
    ///
    /// Polls with exponential backoff; expiry yields [`FeedError::Busy`].
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, FeedError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(FeedError::storage)?;
        }

        let deadline = Instant::now() + timeout;
        let mut backoff = INITIAL_BACKOFF;
        let mut file = open(path)?;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) if !still_linked(&file, path) => {
                    debug!(path = %path.display(), "lock file was removed by its holder, reopening");
                    file = open(path)?;
                }
                Ok(()) => {
                    debug!(path = %path.display(), "file lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(backoff.min(deadline.saturating_duration_since(Instant::now())));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "timed out waiting for file lock");
                    return Err(FeedError::Busy {
                        key: path.display().to_string(),
                    });
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open(path: &Path) -> Result<File, FeedError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(FeedError::storage)
}

/// Whether `path` still names the open `file`.
#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(named)) => held.dev() == named.dev() && held.ino() == named.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, _path: &Path) -> bool {
    true
}

/// Unix only: elsewhere an open file cannot be unlinked and the lock file
/// stays for the next holder.
#[cfg(unix)]
fn remove_lock_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "could not remove lock file");
    }
}

#[cfg(not(unix))]
fn remove_lock_file(_path: &Path) {}

impl Drop for FileLock {
    fn drop(&mut self) {
        remove_lock_file(&self.path);
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "failed to release file lock");
        }
    }
}

impl StorageLock for FileLock {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget").join(".widget-1.0.0.zip.lock");

        let first = FileLock::acquire(&path, Duration::from_millis(100)).unwrap();
        assert_eq!(first.path(), path);

        let second = FileLock::acquire(&path, Duration::from_millis(100));
        assert!(matches!(second, Err(FeedError::Busy { .. })));

        drop(first);
        FileLock::acquire(&path, Duration::from_millis(100)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn lock_file_is_removed_on_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".widget-1.0.0.zip.lock");

        let lock = FileLock::acquire(&path, Duration::from_millis(100)).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());

        let again = FileLock::acquire(&path, Duration::from_millis(100)).unwrap();
        assert!(path.exists());
        drop(again);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn waiter_reopens_a_removed_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".widget-1.0.0.zip.lock");
        let first = FileLock::acquire(&path, Duration::from_millis(100)).unwrap();

        let waiter = {
            let path = path.clone();
            std::thread::spawn(move || FileLock::acquire(&path, Duration::from_secs(5)))
        };
        std::thread::sleep(Duration::from_millis(50));
        drop(first);

        let second = waiter.join().unwrap().unwrap();
        assert!(path.exists(), "the waiter holds a lock on the file the path names");
        assert!(still_linked(&second.file, &path));
        let third = FileLock::acquire(&path, Duration::from_millis(100));
        assert!(matches!(third, Err(FeedError::Busy { .. })));
    }

    #[test]
    fn lock_timeout_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("held.lock");
        let _held = FileLock::acquire(&path, Duration::from_millis(50)).unwrap();

        let started = Instant::now();
        let result = FileLock::acquire(&path, Duration::from_millis(300));
        assert!(result.is_err());
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
