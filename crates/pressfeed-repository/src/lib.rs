// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Package repositories for pressfeed.
//!
//! Installed sources scan the host's plugin and theme directories; the
//! wrappers in this crate compose over them (union, cache, whitelist,
//! query) and [`MetadataTransformer`] renders the result as a Composer
//! repository document.

pub mod cached;
pub mod factory;
pub mod headers;
pub mod installed;
pub mod multi;
pub mod query;
pub mod transformer;
pub mod whitelist;

pub use cached::CachedRepository;
pub use factory::PackageFactory;
pub use headers::{ComponentHeaders, HEADER_SCAN_BYTES, parse_headers, read_headers};
pub use installed::{HeaderVersion, InstalledSource};
pub use multi::MultiRepository;
pub use query::{PackageQuery, QueryRepository};
pub use transformer::{
    DEFAULT_DOWNLOAD_BASE, FeedAuthor, FeedDist, FeedDocument, FeedPackage, FeedRelease,
    MetadataTransformer,
};
pub use whitelist::{Whitelist, WhitelistRepository};
