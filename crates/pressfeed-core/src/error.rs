// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the pressfeed package registry.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all pressfeed components.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Configuration errors (invalid TOML, unreadable whitelist or key files).
    #[error("configuration error: {0}")]
    Config(String),

    /// The host's installed component listing could not be read.
    #[error("package source `{source_name}` unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A version string could not be parsed.
    #[error("invalid version `{raw}`: {reason}")]
    InvalidVersion { raw: String, reason: String },

    /// A historical release was requested but its artifact does not exist.
    #[error("archive not found for {slug} {version}")]
    ArchiveNotFound { slug: String, version: String },

    /// Building a release archive failed.
    #[error("failed to build archive for {slug} {version}: {message}")]
    ArchiveBuildFailed {
        slug: String,
        version: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A storage key or locator resolved outside the storage root.
    #[error("invalid storage locator `{locator}`: {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// A storage locator does not exist.
    #[error("storage object `{locator}` not found")]
    StorageNotFound { locator: String },

    /// Storage backend I/O failure.
    #[error("storage error: {source}")]
    Storage {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The authentication chain denied the request.
    #[error("authentication denied: {reason}")]
    AuthenticationDenied { reason: String },

    /// No visible package with this slug exists.
    #[error("package `{slug}` not found")]
    PackageNotFound { slug: String },

    /// The package exists but has no release with this version.
    #[error("release {version} of `{slug}` not found")]
    ReleaseNotFound { slug: String, version: String },

    /// The package is installed but not whitelisted.
    #[error("package `{slug}` is not whitelisted")]
    Forbidden { slug: String },

    /// A build for the same release is in progress and did not finish in time.
    #[error("release `{key}` is busy, retry later")]
    Busy { key: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FeedError {
    /// Wraps an I/O error as a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        FeedError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true when the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Busy { .. } | FeedError::Timeout { .. })
    }

    /// Returns true for errors that mean "this thing does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FeedError::ArchiveNotFound { .. }
                | FeedError::StorageNotFound { .. }
                | FeedError::PackageNotFound { .. }
                | FeedError::ReleaseNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(FeedError::Busy { key: "widget/1.0.0".into() }.is_retryable());
        assert!(
            FeedError::Timeout {
                duration: Duration::from_secs(1)
            }
            .is_retryable()
        );
        assert!(!FeedError::Internal("boom".into()).is_retryable());
    }

    #[test]
    fn not_found_errors() {
        assert!(
            FeedError::ArchiveNotFound {
                slug: "widget".into(),
                version: "1.0.0".into()
            }
            .is_not_found()
        );
        assert!(!FeedError::Forbidden { slug: "widget".into() }.is_not_found());
    }

    #[test]
    fn source_unavailable_message_names_source() {
        let err = FeedError::SourceUnavailable {
            source_name: "installed-plugins".into(),
            message: "permission denied".into(),
            source: None,
        };
        assert!(err.to_string().contains("installed-plugins"));
    }
}
