// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Release archives for pressfeed packages.
//!
//! [`Archiver`] turns an installed component directory into a deterministic
//! zip file; [`ReleaseManager`] decides when to build one, caches it in
//! storage and hands back archives of previously released versions.

pub mod archiver;
pub mod manager;

pub use archiver::{ArchiveSummary, Archiver, DEFAULT_EXCLUDES, SourceEntry};
pub use manager::{
    Archive, InstalledVersion, ReleaseManager, ReleaseManagerConfig, archive_key,
};
