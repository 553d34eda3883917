// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for pressfeed integration tests.
//!
//! - [`fixtures`] writes installed plugins, themes, key files and whitelist
//!   files the way a WordPress host lays them out.
//! - [`TestHarness`] assembles a full registry over a temp directory and
//!   drives its router in-process.

pub mod fixtures;
pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder, TestResponse};
