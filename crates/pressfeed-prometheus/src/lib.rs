// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for pressfeed.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via [`PrometheusMetrics::render`],
//! which the gateway exposes on `/metrics`.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pressfeed_core::FeedError;

pub use recording::{
    record_archive_build, record_archive_build_duration, record_auth, record_cache,
    record_download, record_feed_request, register_metrics, set_packages_visible,
};

/// Handle to the process-wide Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: PrometheusHandle,
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl PrometheusMetrics {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, FeedError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| FeedError::Internal(format!("failed to install Prometheus recorder: {e}")))?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Wraps an existing handle, for recorders installed elsewhere.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
