// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::{MethodRouter, get};
use pressfeed_auth::AuthChain;
use pressfeed_core::FeedError;
use pressfeed_release::ReleaseManager;
use pressfeed_repository::{MetadataTransformer, WhitelistRepository};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::routes::RouteId;

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Instant,
    /// Renders the Prometheus exposition; `None` disables `/metrics`.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: Instant::now(),
            prometheus_render,
        }
    }
}

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The whitelisted view every registry route reads through.
    pub repository: Arc<WhitelistRepository>,
    pub releases: ReleaseManager,
    pub transformer: MetadataTransformer,
    pub auth: Arc<AuthChain>,
    /// Answer 404 instead of 403 for installed but non-whitelisted packages.
    pub hide_forbidden: bool,
    pub health: HealthState,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("transformer", &self.transformer)
            .field("auth", &self.auth)
            .field("hide_forbidden", &self.hide_forbidden)
            .field("metrics", &self.health.prometheus_render.is_some())
            .finish_non_exhaustive()
    }
}

fn handler(route: RouteId) -> MethodRouter<GatewayState> {
    match route {
        RouteId::Feed => get(handlers::get_feed),
        RouteId::Download => get(handlers::get_download),
        RouteId::Health => get(handlers::get_health),
        RouteId::Metrics => get(handlers::get_metrics),
    }
}

/// Builds the application router. Routes that require authentication sit
/// behind the auth middleware; the rest are public.
pub fn router(state: GatewayState) -> Router {
    let mut public = Router::new();
    let mut protected = Router::new();
    for route in RouteId::ALL {
        if route.requires_auth() {
            protected = protected.route(route.path(), handler(route));
        } else {
            public = public.route(route.path(), handler(route));
        }
    }

    let protected = protected.route_layer(axum_middleware::from_fn_with_state(
        state.auth.clone(),
        auth_middleware,
    ));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn bind(addr: &str) -> Result<TcpListener, FeedError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| FeedError::Internal(format!("failed to bind {addr}: {e}")))
}

/// Serves until `shutdown` is cancelled, then drains in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), FeedError> {
    let addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    info!(%addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| FeedError::Internal(format!("gateway server error: {e}")))?;

    info!("gateway stopped");
    Ok(())
}
