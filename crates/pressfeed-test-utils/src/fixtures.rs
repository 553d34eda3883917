// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk fixtures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pressfeed_auth::{ApiKey, KeyFile};

/// Writes `<root>/<slug>/<slug>.php` with plugin headers and one include.
///
/// Rewriting an existing plugin replaces its main file, which is how an
/// upgrade looks on disk.
pub fn write_plugin(root: &Path, slug: &str, name: &str, version: &str) -> io::Result<PathBuf> {
    let dir = root.join(slug);
    fs::create_dir_all(dir.join("includes"))?;
    fs::write(
        dir.join(format!("{slug}.php")),
        format!(
            "<?php\n/**\n * Plugin Name: {name}\n * Plugin URI: https://example.com/{slug}\n * Description: {name} for tests.\n * Version: {version}\n * Author: Example Co\n * Author URI: https://example.com\n */\n"
        ),
    )?;
    fs::write(dir.join("includes/functions.php"), format!("<?php // {slug} {version}\n"))?;
    Ok(dir)
}

/// Writes `<root>/<slug>/style.css` with theme headers.
pub fn write_theme(root: &Path, slug: &str, name: &str, version: &str) -> io::Result<PathBuf> {
    let dir = root.join(slug);
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join("style.css"),
        format!("/*\nTheme Name: {name}\nDescription: {name} for tests.\nVersion: {version}\nAuthor: Example Co\n*/\n"),
    )?;
    fs::write(dir.join("functions.php"), format!("<?php // {slug} {version}\n"))?;
    Ok(dir)
}

/// Writes a key file holding `keys`.
pub fn write_keys(path: &Path, keys: &[ApiKey]) -> io::Result<()> {
    let file = KeyFile {
        keys: keys.iter().map(ApiKey::to_record).collect(),
    };
    let body = toml::to_string(&file).map_err(io::Error::other)?;
    fs::write(path, body)
}

/// Writes a whitelist file listing `packages`.
pub fn write_whitelist(path: &Path, packages: &[&str]) -> io::Result<()> {
    let quoted: Vec<String> = packages.iter().map(|p| format!("\"{p}\"")).collect();
    fs::write(path, format!("packages = [{}]\n", quoted.join(", ")))
}
