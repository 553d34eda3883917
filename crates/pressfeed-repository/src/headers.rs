// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File header parsing for installed plugins and themes.
//!
//! Headers are `Key: value` lines inside the leading comment block of the
//! main plugin file or a theme's `style.css`. Only the first 8 KiB of the
//! file are considered; the first occurrence of a key wins, keys match
//! case-insensitively, and comment decoration (`*`, `#`, `//`, a closing
//! `*/` or `?>`) is stripped.

use std::io::{self, Read};
use std::path::Path;
use std::sync::LazyLock;

use pressfeed_core::PackageKind;
use regex::Regex;

/// Bytes of a file scanned for headers.
pub const HEADER_SCAN_BYTES: usize = 8 * 1024;

static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:[ \t]*<\?php)?[ \t/*#@]*([A-Za-z][A-Za-z ]*?)[ \t]*:(.*)$").unwrap()
});

static COMMENT_TAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*(?:\*/|\?>).*").unwrap());

/// Metadata declared in a component's header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentHeaders {
    pub name: String,
    pub uri: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub author_uri: String,
    pub requires_php: String,
}

/// Header key naming the component; a file without it is not a component.
pub fn name_header(kind: PackageKind) -> &'static str {
    match kind {
        PackageKind::Plugin => "Plugin Name",
        PackageKind::Theme => "Theme Name",
    }
}

fn uri_header(kind: PackageKind) -> &'static str {
    match kind {
        PackageKind::Plugin => "Plugin URI",
        PackageKind::Theme => "Theme URI",
    }
}

/// Parses a header block. Returns `None` when the name header is absent or empty.
pub fn parse_headers(content: &str, kind: PackageKind) -> Option<ComponentHeaders> {
    let content = content.replace('\r', "\n");
    let mut found: Vec<(String, String)> = Vec::new();
    for caps in HEADER_LINE.captures_iter(&content) {
        let key = caps[1].trim().to_ascii_lowercase();
        if found.iter().any(|(k, _)| *k == key) {
            continue;
        }
        let value = COMMENT_TAIL.replace(&caps[2], "").trim().to_string();
        found.push((key, value));
    }

    let get = |header: &str| {
        let header = header.to_ascii_lowercase();
        found
            .iter()
            .find(|(k, _)| *k == header)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };

    let name = get(name_header(kind));
    if name.is_empty() {
        return None;
    }
    Some(ComponentHeaders {
        name,
        uri: get(uri_header(kind)),
        version: get("Version"),
        description: get("Description"),
        author: get("Author"),
        author_uri: get("Author URI"),
        requires_php: get("Requires PHP"),
    })
}

/// Reads the first [`HEADER_SCAN_BYTES`] of `path` and parses them.
pub fn read_headers(path: &Path, kind: PackageKind) -> io::Result<Option<ComponentHeaders>> {
    let mut buf = Vec::with_capacity(HEADER_SCAN_BYTES);
    std::fs::File::open(path)?
        .take(HEADER_SCAN_BYTES as u64)
        .read_to_end(&mut buf)?;
    Ok(parse_headers(&String::from_utf8_lossy(&buf), kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLUGIN: &str = r#"<?php
/**
 * Plugin Name: Widget Pro
 * Plugin URI:  https://example.com/widget
 * Description: Adds widgets. Lots of them.
 * Version:     1.2.0
 * Author:      Acme Inc.
 * Author URI:  https://acme.example
 * Requires PHP: 7.4
 * License:     GPL-2.0+
 */

// Version: 9.9.9 appears later and is ignored.
"#;

    #[test]
    fn parses_docblock_plugin_header() {
        let headers = parse_headers(PLUGIN, PackageKind::Plugin).unwrap();
        assert_eq!(headers.name, "Widget Pro");
        assert_eq!(headers.uri, "https://example.com/widget");
        assert_eq!(headers.description, "Adds widgets. Lots of them.");
        assert_eq!(headers.version, "1.2.0");
        assert_eq!(headers.author, "Acme Inc.");
        assert_eq!(headers.author_uri, "https://acme.example");
        assert_eq!(headers.requires_php, "7.4");
    }

    #[test]
    fn parses_theme_stylesheet() {
        let css = "/*\nTheme Name: Twenty Acme\nTheme URI: https://acme.example/theme\nVersion: 2.0\n*/\nbody {}\n";
        let headers = parse_headers(css, PackageKind::Theme).unwrap();
        assert_eq!(headers.name, "Twenty Acme");
        assert_eq!(headers.uri, "https://acme.example/theme");
        assert_eq!(headers.version, "2.0");
        assert!(headers.author.is_empty());
    }

    #[test]
    fn single_line_comment_with_closing_marker() {
        let content = "<?php /* Plugin Name: Tiny */ ?>\n";
        let headers = parse_headers(content, PackageKind::Plugin).unwrap();
        assert_eq!(headers.name, "Tiny");
    }

    #[test]
    fn keys_are_case_insensitive_and_crlf_tolerant() {
        let content = "<?php\r\n/*\r\n * plugin name: Lowercase\r\n * VERSION: 3.1\r\n */\r\n";
        let headers = parse_headers(content, PackageKind::Plugin).unwrap();
        assert_eq!(headers.name, "Lowercase");
        assert_eq!(headers.version, "3.1");
    }

    #[test]
    fn missing_name_is_not_a_component() {
        assert!(parse_headers("<?php\n// Version: 1.0\n", PackageKind::Plugin).is_none());
        assert!(parse_headers(PLUGIN, PackageKind::Theme).is_none());
        assert!(parse_headers("<?php\n/* Plugin Name: */\n", PackageKind::Plugin).is_none());
    }

    #[test]
    fn only_the_first_8k_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.php");
        let mut content = String::from("<?php\n");
        content.push_str(&" ".repeat(HEADER_SCAN_BYTES));
        content.push_str("\n/* Plugin Name: Too Late */\n");
        std::fs::write(&path, content).unwrap();
        assert!(read_headers(&path, PackageKind::Plugin).unwrap().is_none());

        std::fs::write(&path, PLUGIN).unwrap();
        assert!(read_headers(&path, PackageKind::Plugin).unwrap().is_some());
    }
}
