// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is
//! a no-op, so library crates record unconditionally.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all pressfeed metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("pressfeed_feed_requests_total", "Feed document requests by status");
    describe_counter!("pressfeed_downloads_total", "Archive download requests by status");
    describe_counter!(
        "pressfeed_archive_builds_total",
        "Archive lookups by outcome (built, cached, failed, busy, timeout)"
    );
    describe_histogram!(
        "pressfeed_archive_build_seconds",
        "Wall-clock time spent zipping a release"
    );
    describe_counter!(
        "pressfeed_auth_total",
        "Authentication chain decisions by strategy and outcome"
    );
    describe_counter!(
        "pressfeed_repository_cache_total",
        "Repository cache lookups by result"
    );
    describe_gauge!("pressfeed_packages_visible", "Packages exposed by the last feed render");
}

/// Record a feed request and its HTTP status.
pub fn record_feed_request(status: u16) {
    metrics::counter!("pressfeed_feed_requests_total", "status" => status.to_string()).increment(1);
}

/// Record a download request and its HTTP status.
pub fn record_download(status: u16) {
    metrics::counter!("pressfeed_downloads_total", "status" => status.to_string()).increment(1);
}

/// Record the outcome of an archive lookup.
pub fn record_archive_build(outcome: &'static str) {
    metrics::counter!("pressfeed_archive_builds_total", "outcome" => outcome).increment(1);
}

/// Record how long a build took.
pub fn record_archive_build_duration(seconds: f64) {
    metrics::histogram!("pressfeed_archive_build_seconds").record(seconds);
}

/// Record an authentication decision.
pub fn record_auth(strategy: &str, outcome: &'static str) {
    metrics::counter!(
        "pressfeed_auth_total",
        "strategy" => strategy.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a repository cache hit or miss.
pub fn record_cache(repository: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!(
        "pressfeed_repository_cache_total",
        "repository" => repository.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Set the number of packages in the last rendered feed.
pub fn set_packages_visible(count: usize) {
    metrics::gauge!("pressfeed_packages_visible").set(count as f64);
}
