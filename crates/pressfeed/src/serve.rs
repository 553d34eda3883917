// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pressfeed serve` command implementation.
//!
//! Assembles the registry from configuration, starts the file watcher,
//! archives the installed versions in the background and serves HTTP until
//! a shutdown signal arrives.

use std::sync::Arc;

use pressfeed_config::PressfeedConfig;
use pressfeed_core::FeedError;
use pressfeed_gateway::Registry;
use pressfeed_prometheus::PrometheusMetrics;
use tracing::{debug, info, warn};

use crate::shutdown;
use crate::watcher;

/// Runs the `pressfeed serve` command.
pub async fn run_serve(config: PressfeedConfig) -> Result<(), FeedError> {
    init_tracing(&config.logging.level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting pressfeed serve");

    let prometheus = if config.prometheus.enabled {
        match PrometheusMetrics::install() {
            Ok(metrics) => {
                info!("prometheus metrics enabled");
                Some(metrics)
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("prometheus metrics disabled by configuration");
        None
    };
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = prometheus.map(|metrics| {
        Arc::new(move || metrics.render()) as Arc<dyn Fn() -> String + Send + Sync>
    });

    let registry = Arc::new(Registry::from_config(&config)?);
    let cancel = shutdown::install_signal_handler();

    let watch = watcher::spawn(registry.clone(), &config, cancel.clone())?;

    // Archive what is installed now, so the next upgrade leaves it behind
    // as a historical release.
    let startup = registry.clone();
    tokio::spawn(async move {
        match startup.archive_visible().await {
            Ok(results) => {
                let failed = results.iter().filter(|(_, r)| r.is_err()).count();
                info!(archived = results.len() - failed, failed, "startup archiving finished");
            }
            Err(e) => warn!(error = %e, "startup archiving skipped"),
        }
    });

    let addr = config.server.bind_address();
    let listener = pressfeed_gateway::bind(&addr).await?;
    pressfeed_gateway::serve(listener, registry.gateway_state(prometheus_render), cancel.clone()).await?;

    cancel.cancel();
    if let Err(e) = watch.await {
        warn!(error = %e, "file watcher task ended abnormally");
    }
    info!("pressfeed stopped");
    Ok(())
}

/// Initializes the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pressfeed={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
