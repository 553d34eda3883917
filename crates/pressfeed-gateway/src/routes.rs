// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The closed set of routes served by the gateway.

/// Every route, identified independently of its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteId {
    Feed,
    Download,
    Health,
    Metrics,
}

impl RouteId {
    pub const ALL: [RouteId; 4] = [
        RouteId::Feed,
        RouteId::Download,
        RouteId::Health,
        RouteId::Metrics,
    ];

    /// axum path template.
    pub fn path(self) -> &'static str {
        match self {
            RouteId::Feed => "/packages.json",
            RouteId::Download => "/download/{slug}/{version}",
            RouteId::Health => "/health",
            RouteId::Metrics => "/metrics",
        }
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, RouteId::Feed | RouteId::Download)
    }
}
