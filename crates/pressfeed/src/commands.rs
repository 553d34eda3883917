// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI commands: `list`, `archive`, `keys new` and `check`.

use std::fmt::Write as _;
use std::process::ExitCode;

use pressfeed_auth::{ApiKey, KeyFile};
use pressfeed_config::PressfeedConfig;
use pressfeed_core::{FeedError, Package, Repository};
use pressfeed_gateway::Registry;

/// `pressfeed list`: visible packages, newest release first.
pub async fn list(config: PressfeedConfig) -> Result<(), FeedError> {
    let registry = Registry::from_config(&config)?;
    let packages = registry.repository.list_packages().await?;
    print!("{}", format_listing(&packages));
    Ok(())
}

/// `pressfeed archive`: build or confirm the installed version's archive of
/// every visible package.
pub async fn archive(config: PressfeedConfig) -> Result<(), FeedError> {
    let registry = Registry::from_config(&config)?;
    let results = registry.archive_visible().await?;
    let mut failed = 0usize;
    for (id, result) in &results {
        match result {
            Ok(archive) => println!("{id}: {} ({} bytes)", archive.locator, archive.size),
            Err(e) => {
                failed += 1;
                println!("{id}: failed: {e}");
            }
        }
    }
    if failed > 0 {
        return Err(FeedError::Internal(format!(
            "{failed} of {} archives could not be built",
            results.len()
        )));
    }
    Ok(())
}

/// `pressfeed keys new <user>`.
pub fn new_key(user: &str) -> ExitCode {
    let key = ApiKey::generate(user);
    match render_key_entry(&key) {
        Ok(entry) => {
            eprintln!("# key {} for {user}; append to the api_keys_file", key.id());
            print!("{entry}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `pressfeed check`: the configuration already validated when it loaded.
pub fn check(config: &PressfeedConfig) {
    println!("configuration ok");
    println!("  listen:    {}", config.server.bind_address());
    println!("  vendor:    {}", config.sources.vendor);
    if let Some(dir) = &config.sources.plugins_dir {
        println!("  plugins:   {dir}");
    }
    if let Some(dir) = &config.sources.themes_dir {
        println!("  themes:    {dir}");
    }
    println!("  cache:     {}", config.storage.cache_dir);
    match &config.auth.api_keys_file {
        Some(file) => println!("  api keys:  {file}"),
        None => println!("  api keys:  none (every registry request will be denied)"),
    }
}

fn render_key_entry(key: &ApiKey) -> Result<String, FeedError> {
    let file = KeyFile {
        keys: vec![key.to_record()],
    };
    toml::to_string(&file).map_err(|e| FeedError::Internal(format!("could not render key: {e}")))
}

fn format_listing(packages: &[Package]) -> String {
    let mut out = String::new();
    for package in packages {
        let versions: Vec<String> = package
            .releases()
            .iter()
            .map(|release| {
                if release.is_live() {
                    format!("{} (installed)", release.version())
                } else {
                    release.version().to_string()
                }
            })
            .collect();
        let _ = writeln!(
            out,
            "{:<40} {:<6} {}",
            package.id().name(),
            package.kind(),
            if versions.is_empty() {
                "-".to_string()
            } else {
                versions.join(", ")
            }
        );
    }
    out
}
