// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the pressfeed package registry.
//!
//! This crate provides the data model (packages, releases, locators), the
//! version parser, the error taxonomy and the traits at the seams between
//! the repository, storage and release components.

pub mod error;
pub mod traits;
pub mod types;
pub mod version;

// Re-export key items at crate root for ergonomic imports.
pub use error::FeedError;
pub use traits::{Repository, Storage, StorageLock};
pub use types::{
    AuthOutcome, Identity, Locator, Package, PackageBuilder, PackageId, PackageKind, Release,
    ReleaseSource,
};
pub use version::{Version, VersionParser};
