// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for pressfeed.
//!
//! Serves the Composer feed and release downloads behind the
//! authentication chain, plus public health and metrics endpoints.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod server;

pub use error::{ApiError, ErrorBody, status_of};
pub use registry::Registry;
pub use routes::RouteId;
pub use server::{GatewayState, HealthState, bind, router, serve};
