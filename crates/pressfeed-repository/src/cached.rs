// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memoizing wrapper around a repository.
//!
//! The listing lives in a `tokio::sync::OnceCell`: concurrent callers on a
//! cold cache all await the single computation in flight. Invalidation
//! swaps in a fresh cell, so a computation that was already running fills
//! the discarded cell and never resurrects stale data.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use pressfeed_core::{FeedError, Package, Repository};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type Listing = Arc<Vec<Package>>;

pub struct CachedRepository {
    name: String,
    inner: Arc<dyn Repository>,
    cell: ArcSwap<OnceCell<Listing>>,
    timeout: Duration,
}

impl CachedRepository {
    /// Wraps `inner`; callers wait at most `timeout` for a listing.
    pub fn new(inner: Arc<dyn Repository>, timeout: Duration) -> Self {
        Self {
            name: format!("cached({})", inner.name()),
            inner,
            cell: ArcSwap::from_pointee(OnceCell::new()),
            timeout,
        }
    }

    /// Forget the memoized listing; the next read recomputes it.
    pub fn invalidate(&self) {
        self.cell.store(Arc::new(OnceCell::new()));
        debug!(repository = %self.name, "cache invalidated");
    }

    pub fn is_warm(&self) -> bool {
        self.cell.load().initialized()
    }
}

#[async_trait]
impl Repository for CachedRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn invalidate(&self) {
        CachedRepository::invalidate(self);
    }

    async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
        let cell = self.cell.load_full();
        if let Some(listing) = cell.get() {
            pressfeed_prometheus::record_cache(self.inner.name(), true);
            return Ok(listing.as_ref().clone());
        }

        pressfeed_prometheus::record_cache(self.inner.name(), false);
        let populate = cell.get_or_try_init(|| async {
            debug!(repository = %self.name, "populating cache");
            self.inner.list_packages().await.map(Arc::new)
        });
        match tokio::time::timeout(self.timeout, populate).await {
            Ok(listing) => Ok(listing?.as_ref().clone()),
            Err(_) => {
                warn!(repository = %self.name, timeout = ?self.timeout, "timed out waiting for listing");
                Err(FeedError::Timeout {
                    duration: self.timeout,
                })
            }
        }
    }
}
