// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Union of several repositories.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use pressfeed_core::{FeedError, Package, Repository};
use tracing::debug;

/// Set union by package id. On collision the child registered first wins.
pub struct MultiRepository {
    name: String,
    children: Vec<Arc<dyn Repository>>,
}

impl MultiRepository {
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn Repository>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn children(&self) -> &[Arc<dyn Repository>] {
        &self.children
    }
}

#[async_trait]
impl Repository for MultiRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn invalidate(&self) {
        for child in &self.children {
            child.invalidate();
        }
    }

    async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
        let mut merged = BTreeMap::new();
        for child in &self.children {
            for package in child.list_packages().await? {
                match merged.entry(package.id().clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(package);
                    }
                    Entry::Occupied(_) => {
                        debug!(
                            package = %package.id(),
                            dropped_from = child.name(),
                            "duplicate package id, keeping the first"
                        );
                    }
                }
            }
        }
        Ok(merged.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressfeed_core::{PackageId, PackageKind};

    struct Fixed(&'static str, Vec<Package>);

    #[async_trait]
    impl Repository for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
            Ok(self.1.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl Repository for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn list_packages(&self) -> Result<Vec<Package>, FeedError> {
            Err(FeedError::Internal("unreadable".into()))
        }
    }

    fn package(slug: &str, kind: PackageKind, name: &str) -> Package {
        Package::builder(PackageId::new("acme", slug), kind, format!("/srv/{slug}"))
            .name(name)
            .build()
    }

    #[tokio::test]
    async fn first_registered_child_wins_on_collision() {
        let plugins = Fixed(
            "plugins",
            vec![
                package("shared", PackageKind::Plugin, "Shared plugin"),
                package("widget", PackageKind::Plugin, "Widget"),
            ],
        );
        let themes = Fixed(
            "themes",
            vec![
                package("shared", PackageKind::Theme, "Shared theme"),
                package("twenty", PackageKind::Theme, "Twenty"),
            ],
        );
        let multi = MultiRepository::new("installed", vec![Arc::new(plugins), Arc::new(themes)]);

        let listed = multi.list_packages().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|p| p.slug()).collect();
        assert_eq!(names, vec!["shared", "twenty", "widget"]);
        assert_eq!(listed[0].kind(), PackageKind::Plugin);
        assert_eq!(listed[0].name(), "Shared plugin");
        assert_eq!(multi.children().len(), 2);
    }

    #[tokio::test]
    async fn any_failing_child_fails_the_union() {
        let ok = Fixed("plugins", vec![package("widget", PackageKind::Plugin, "Widget")]);
        let multi = MultiRepository::new("installed", vec![Arc::new(ok), Arc::new(Broken)]);
        assert!(multi.list_packages().await.is_err());
        assert!(multi.get_package("widget").await.is_err());
    }
}
