// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reacts to changes of the host's installed components and of the
//! whitelist and key files.
//!
//! Source changes drop the affected listing caches and archive the newly
//! installed versions; file changes reload the corresponding store. The
//! store keeps its previous snapshot when a reload fails.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use pressfeed_config::PressfeedConfig;
use pressfeed_core::{FeedError, PackageKind};
use pressfeed_gateway::Registry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEBOUNCE: Duration = Duration::from_millis(750);

/// What a changed path means for the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Change {
    Source(PackageKind),
    Whitelist,
    Keys,
}

/// The paths being watched and how to classify events under them.
#[derive(Debug, Clone, Default)]
pub struct WatchTargets {
    sources: Vec<(PackageKind, PathBuf)>,
    whitelist: Option<PathBuf>,
    keys: Option<PathBuf>,
}

impl WatchTargets {
    pub fn from_config(config: &PressfeedConfig) -> Self {
        let mut sources = Vec::new();
        if let Some(dir) = &config.sources.plugins_dir {
            sources.push((PackageKind::Plugin, PathBuf::from(dir)));
        }
        if let Some(dir) = &config.sources.themes_dir {
            sources.push((PackageKind::Theme, PathBuf::from(dir)));
        }
        Self {
            sources,
            whitelist: config.whitelist.file.as_ref().map(PathBuf::from),
            keys: config.auth.api_keys_file.as_ref().map(PathBuf::from),
        }
    }

    /// Maps an event path to the change it signals, if any.
    ///
    /// Files are matched by exact path since their parent directory is
    /// what gets watched.
    pub fn classify(&self, path: &Path) -> Option<Change> {
        if self.whitelist.as_deref() == Some(path) {
            return Some(Change::Whitelist);
        }
        if self.keys.as_deref() == Some(path) {
            return Some(Change::Keys);
        }
        self.sources
            .iter()
            .find(|(_, root)| path.starts_with(root))
            .map(|(kind, _)| Change::Source(*kind))
    }

    /// Directories to register with the watcher.
    fn watch_list(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut list: Vec<(PathBuf, RecursiveMode)> = self
            .sources
            .iter()
            .map(|(_, root)| (root.clone(), RecursiveMode::Recursive))
            .collect();
        for file in [&self.whitelist, &self.keys].into_iter().flatten() {
            if let Some(parent) = file.parent() {
                let parent = if parent.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    parent.to_path_buf()
                };
                if !list.iter().any(|(p, _)| *p == parent) {
                    list.push((parent, RecursiveMode::NonRecursive));
                }
            }
        }
        list
    }
}

/// Starts watching; the returned task ends when `cancel` fires.
pub fn spawn(
    registry: Arc<Registry>,
    config: &PressfeedConfig,
    cancel: CancellationToken,
) -> Result<JoinHandle<()>, FeedError> {
    let targets = WatchTargets::from_config(config);
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();

    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let _ = tx.send(events.into_iter().map(|event| event.path).collect());
        }
        Err(e) => warn!(error = %e, "file watcher error"),
    })
    .map_err(|e| FeedError::Internal(format!("could not start file watcher: {e}")))?;

    for (path, mode) in targets.watch_list() {
        match debouncer.watcher().watch(&path, mode) {
            Ok(()) => debug!(path = %path.display(), "watching"),
            Err(e) => warn!(path = %path.display(), error = %e, "cannot watch path, changes will not be picked up"),
        }
    }

    Ok(tokio::spawn(async move {
        // Dropping the debouncer stops its thread.
        let _debouncer = debouncer;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                batch = rx.recv() => {
                    let Some(paths) = batch else { break };
                    let changes: BTreeSet<Change> =
                        paths.iter().filter_map(|path| targets.classify(path)).collect();
                    apply(&registry, &changes).await;
                }
            }
        }
        debug!("file watcher stopped");
    }))
}

/// Applies one debounced batch of changes.
pub async fn apply(registry: &Registry, changes: &BTreeSet<Change>) {
    let mut sources_changed = false;
    for change in changes {
        match change {
            Change::Source(kind) => {
                info!(%kind, "installed components changed, invalidating listing");
                registry.invalidate(Some(*kind));
                sources_changed = true;
            }
            Change::Whitelist => match registry.whitelist.reload() {
                Ok(count) => info!(entries = count, "whitelist reloaded"),
                Err(e) => warn!(error = %e, "whitelist reload failed, keeping previous entries"),
            },
            Change::Keys => match registry.keys.reload() {
                Ok(count) => info!(keys = count, "api keys reloaded"),
                Err(e) => warn!(error = %e, "api key reload failed, keeping previous keys"),
            },
        }
    }

    // A newly whitelisted package also gets its installed version archived.
    if sources_changed || changes.contains(&Change::Whitelist) {
        match registry.archive_visible().await {
            Ok(results) => {
                for (id, result) in results {
                    if let Ok(archive) = result {
                        debug!(package = %id, locator = %archive.locator, "installed version archived");
                    }
                }
            }
            Err(e) => warn!(error = %e, "archiving after change failed"),
        }
    }
}
