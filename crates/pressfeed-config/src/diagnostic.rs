// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with "did you mean" suggestions.
//!
//! Unknown keys are matched against the section's valid keys with
//! Jaro-Winkler similarity and, when the offending file is known, pointed
//! at with a source span.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a suggestion (`cache_dri` -> `cache_dir`).
const MIN_SIMILARITY: f64 = 0.75;

/// A configuration error with enough context for miette to render it.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("`{key}` is not a pressfeed setting")]
    #[diagnostic(
        code(pressfeed::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted path of the unrecognized key, e.g. `storage.lock_timeout`.
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("unknown key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(pressfeed::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("`{key}` is required")]
    #[diagnostic(
        code(pressfeed::config::missing_key),
        help("add `{key} = <value>` to pressfeed.toml")
    )]
    MissingKey { key: String },

    /// A value parsed but does not make sense.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(pressfeed::config::validation))]
    Validation { key: String, message: String },

    #[error("could not load configuration: {0}")]
    #[diagnostic(code(pressfeed::config::other))]
    Other(String),
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            key: key.into(),
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? ({valid_keys})"),
        None => format!("expected one of: {valid_keys}"),
    }
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
///
/// `files` pairs paths with their contents for span lookup.
pub fn from_figment(err: figment::Error, files: &[(String, String)]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let section = enclosing_section(&section, field);
                    let (span, src) = locate(&error, section, field, files);
                    let mut path = section.to_vec();
                    path.push(field.clone());
                    ConfigError::UnknownKey {
                        key: path.join("."),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => {
                    let mut path = section;
                    path.push(field.to_string());
                    ConfigError::MissingKey { key: path.join(".") }
                }
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: section.join("."),
                    detail: format!("found {actual}"),
                    expected: expected.to_string(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Table holding an unknown `field`. Figment reports the path down to the
/// field itself, so a trailing `field` is dropped.
fn enclosing_section<'a>(path: &'a [String], field: &str) -> &'a [String] {
    match path.split_last() {
        Some((last, parent)) if last == field => parent,
        _ => path,
    }
}

/// Finds the span of `field` in whichever source file the error came from.
fn locate(
    error: &figment::error::Error,
    section: &[String],
    field: &str,
    files: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match origin {
        Some(origin) => files.iter().find(|(p, _)| *p == origin),
        // Inline strings carry no file metadata; fall back to a lone source.
        None if files.len() == 1 => files.first(),
        None => None,
    };

    let Some((path, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the `[section]` table of `content`.
///
/// Top-level fields (empty `path`) are searched from the start.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let key_start = line.trim_start();
        if key_start.starts_with('[') && offset != start {
            // Next table; the key is not in this section.
            return None;
        }
        if let Some(after) = key_start.strip_prefix(field) {
            if after.starts_with([' ', '\t', '=']) {
                return Some(offset + (line.len() - key_start.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Best valid key above the similarity threshold, if any.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > MIN_SIMILARITY)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("config error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_keys() {
        let valid = &["cache_dir", "lock_timeout_secs", "build_timeout_secs"];
        assert_eq!(suggest_key("cache_dri", valid), Some("cache_dir".to_string()));
        assert_eq!(
            suggest_key("lock_timeout", valid),
            Some("lock_timeout_secs".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["host", "port", "hide_forbidden"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn unknown_field_is_not_repeated_in_its_section() {
        let path = vec!["storage".to_string(), "cache_dri".to_string()];
        assert_eq!(enclosing_section(&path, "cache_dri"), &path[..1]);
        assert_eq!(enclosing_section(&path[..1], "cache_dri"), &path[..1]);
        assert!(enclosing_section(&[], "agent").is_empty());
    }

    #[test]
    fn finds_key_inside_its_section() {
        let content = "[server]\nport = 80\n\n[storage]\ncache_dri = \"/tmp\"\n";
        let path = vec!["storage".to_string()];
        let offset = find_key_offset(content, &path, "cache_dri").unwrap();
        assert_eq!(&content[offset..offset + 9], "cache_dri");
    }

    #[test]
    fn key_in_other_section_is_not_matched() {
        let content = "[server]\n\n[storage]\nport = 80\n";
        let path = vec!["server".to_string()];
        assert_eq!(find_key_offset(content, &path, "port"), None);
    }
}
