// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filtered views over a repository.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use pressfeed_core::{FeedError, Package, PackageKind, Repository};

/// Restricts a listing by kind and/or by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageQuery {
    pub kind: Option<PackageKind>,
    /// Slugs or `vendor/slug` names; empty means no restriction.
    pub names: BTreeSet<String>,
}

impl PackageQuery {
    pub fn kind(kind: PackageKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.names.is_empty()
    }

    pub fn matches(&self, package: &Package) -> bool {
        if self.kind.is_some_and(|kind| kind != package.kind()) {
            return false;
        }
        self.names.is_empty() || self.names.iter().any(|name| package.matches(name))
    }
}

/// A repository view that only yields packages matching a query.
pub struct QueryRepository {
    name: String,
    inner: Arc<dyn Repository>,
    query: PackageQuery,
}

impl QueryRepository {
    pub fn new(inner: Arc<dyn Repository>, query: PackageQuery) -> Self {
        Self {
            name: format!("query({})", inner.name()),
            inner,
            query,
        }
    }
}

#[async_trait]
impl Repository for QueryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
        let mut packages = self.inner.list_packages().await?;
        if !self.query.is_empty() {
            packages.retain(|package| self.query.matches(package));
        }
        Ok(packages)
    }

    fn invalidate(&self) {
        self.inner.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use pressfeed_core::PackageId;

    use super::*;

    fn package(slug: &str, kind: PackageKind) -> Package {
        Package::builder(PackageId::new("acme", slug), kind, "/srv").build()
    }

    #[test]
    fn query_by_kind_and_name() {
        let widget = package("widget", PackageKind::Plugin);
        let twenty = package("twenty", PackageKind::Theme);

        assert!(PackageQuery::default().matches(&widget));
        assert!(PackageQuery::kind(PackageKind::Theme).matches(&twenty));
        assert!(!PackageQuery::kind(PackageKind::Theme).matches(&widget));

        let named = PackageQuery {
            kind: None,
            names: BTreeSet::from(["acme/widget".to_string()]),
        };
        assert!(named.matches(&widget));
        assert!(!named.matches(&twenty));
    }
}
