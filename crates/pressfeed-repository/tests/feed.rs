// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feed rendering over the full repository stack built from real directories.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pressfeed_core::{PackageKind, Repository, Storage};
use pressfeed_release::{Archiver, ReleaseManager, ReleaseManagerConfig};
use pressfeed_repository::{
    CachedRepository, InstalledSource, MetadataTransformer, MultiRepository, PackageFactory,
    PackageQuery, QueryRepository, Whitelist, WhitelistRepository,
};
use pressfeed_storage::LocalStorage;

struct Stack {
    _dir: tempfile::TempDir,
    plugins: std::path::PathBuf,
    storage: Arc<LocalStorage>,
    cache: Arc<CachedRepository>,
    whitelist: Arc<Whitelist>,
    visible: Arc<WhitelistRepository>,
}

fn plugin(root: &Path, slug: &str, name: &str, version: &str) {
    let dir = root.join(slug);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(format!("{slug}.php")),
        format!("<?php\n/**\n * Plugin Name: {name}\n * Version: {version}\n * Requires PHP: 7.4\n */\n"),
    )
    .unwrap();
}

fn theme(root: &Path, slug: &str, version: &str) {
    let dir = root.join(slug);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("style.css"),
        format!("/*\nTheme Name: {slug}\nVersion: {version}\n*/\n"),
    )
    .unwrap();
}

fn stack(whitelist: &[&str]) -> Stack {
    let dir = tempfile::tempdir().unwrap();
    let plugins = dir.path().join("plugins");
    let themes = dir.path().join("themes");
    plugin(&plugins, "widget", "Widget", "1.0.0");
    plugin(&plugins, "gadget", "Gadget", "2.0.0");
    theme(&themes, "twenty", "3.1");

    let storage = Arc::new(LocalStorage::new(dir.path().join("cache")).unwrap());
    let releases = ReleaseManager::new(storage.clone(), Archiver::default(), ReleaseManagerConfig::default());
    let factory = Arc::new(PackageFactory::new("acme").with_release_manager(releases));

    let sources: Vec<Arc<dyn Repository>> = vec![
        Arc::new(InstalledSource::plugins(&plugins, factory.clone())),
        Arc::new(InstalledSource::themes(&themes, factory)),
    ];
    let multi = Arc::new(MultiRepository::new("installed", sources));
    let cache = Arc::new(CachedRepository::new(multi, Duration::from_secs(5)));
    let whitelist = Arc::new(Whitelist::new(whitelist.iter().copied()));
    let visible = Arc::new(WhitelistRepository::new(cache.clone(), whitelist.clone()));

    Stack {
        _dir: dir,
        plugins,
        storage,
        cache,
        whitelist,
        visible,
    }
}

#[tokio::test]
async fn feed_contains_only_whitelisted_packages() {
    let stack = stack(&["acme/widget"]);
    let document = MetadataTransformer::default()
        .transform(stack.visible.as_ref())
        .await
        .unwrap();

    assert_eq!(document.package_names().collect::<Vec<_>>(), vec!["acme/widget"]);
    let releases = &document.packages["acme/widget"].0;
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].version, "1.0.0");
    assert_eq!(releases[0].dist.url, "/download/widget/1.0.0");
    assert_eq!(releases[0].require["php"], ">=7.4");
}

#[tokio::test]
async fn unchanged_state_renders_identical_bytes() {
    let stack = stack(&["widget", "gadget", "twenty"]);
    let transformer = MetadataTransformer::default();

    let first = transformer.render(stack.visible.as_ref()).await.unwrap();
    stack.cache.invalidate();
    let second = transformer.render(stack.visible.as_ref()).await.unwrap();
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_slice(&first).unwrap();
    let names: Vec<&String> = value["packages"].as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["acme/gadget", "acme/twenty", "acme/widget"]);
    assert_eq!(value["packages"]["acme/twenty"]["3.1.0"]["type"], "wordpress-theme");
}

#[tokio::test]
async fn whitelist_changes_apply_without_invalidation() {
    let stack = stack(&["widget"]);
    assert_eq!(stack.visible.list_packages().await.unwrap().len(), 1);
    assert!(stack.cache.is_warm());

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("whitelist.toml");
    fs::write(&file, "packages = [\"widget\", \"gadget\"]\n").unwrap();
    let reloadable = Arc::new(Whitelist::with_file(Vec::<String>::new(), &file).unwrap());
    let visible = WhitelistRepository::new(stack.cache.clone(), reloadable.clone());
    assert_eq!(visible.list_packages().await.unwrap().len(), 2);

    fs::write(&file, "packages = []\n").unwrap();
    reloadable.reload().unwrap();
    assert!(visible.list_packages().await.unwrap().is_empty());
    assert!(stack.whitelist.allows("widget"));
}

#[tokio::test]
async fn cache_serves_stale_listing_until_invalidated() {
    let stack = stack(&["widget"]);
    stack.visible.list_packages().await.unwrap();

    plugin(&stack.plugins, "widget", "Widget", "1.1.0");
    let stale = stack.visible.get_package("widget").await.unwrap().unwrap();
    assert_eq!(stale.installed_version().unwrap().to_string(), "1.0.0");

    stack.cache.invalidate();
    let fresh = stack.visible.get_package("widget").await.unwrap().unwrap();
    assert_eq!(fresh.installed_version().unwrap().to_string(), "1.1.0");
}

#[tokio::test]
async fn archived_versions_appear_below_the_installed_one() {
    let stack = stack(&["widget"]);
    stack
        .storage
        .put("widget/widget-0.9.0.zip", b"PK archived")
        .await
        .unwrap();

    let document = MetadataTransformer::new("https://feed.test/download")
        .transform(stack.visible.as_ref())
        .await
        .unwrap();
    let versions: Vec<&str> = document.packages["acme/widget"]
        .0
        .iter()
        .map(|release| release.version.as_str())
        .collect();
    assert_eq!(versions, vec!["1.0.0", "0.9.0"]);
    assert_eq!(
        document.packages["acme/widget"].0[1].dist.url,
        "https://feed.test/download/widget/0.9.0"
    );
}

#[tokio::test]
async fn query_restricts_feed_to_one_kind() {
    let stack = stack(&["widget", "gadget", "twenty"]);
    let themes = QueryRepository::new(stack.visible.clone(), PackageQuery::kind(PackageKind::Theme));
    let document = MetadataTransformer::default().transform(&themes).await.unwrap();
    assert_eq!(document.package_names().collect::<Vec<_>>(), vec!["acme/twenty"]);
}
