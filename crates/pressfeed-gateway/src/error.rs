// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`FeedError`] onto HTTP responses.
//!
//! Every error body is `{"error": <code>, "reason": <text>}`. Server-side
//! failures are logged in full and answered with a generic reason.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pressfeed_core::FeedError;
use serde::Serialize;
use tracing::{error, warn};

/// Seconds a client should wait before retrying a 503.
pub const RETRY_AFTER_SECS: u64 = 5;

/// Realm announced with 401 responses.
pub const REALM: &str = "pressfeed";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub reason: String,
}

/// An error on its way to the client.
#[derive(Debug)]
pub enum ApiError {
    Feed(FeedError),
    /// Malformed request parameters.
    BadRequest(String),
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError::Feed(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Feed(err) => status_of(err),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Feed(err) => ErrorBody {
                error: code_of(err).to_string(),
                reason: reason_of(err),
            },
            ApiError::BadRequest(reason) => ErrorBody {
                error: "bad_request".to_string(),
                reason: reason.clone(),
            },
        }
    }
}

/// HTTP status for each error kind.
pub fn status_of(err: &FeedError) -> StatusCode {
    match err {
        FeedError::AuthenticationDenied { .. } => StatusCode::UNAUTHORIZED,
        FeedError::Forbidden { .. } => StatusCode::FORBIDDEN,
        FeedError::PackageNotFound { .. }
        | FeedError::ReleaseNotFound { .. }
        | FeedError::ArchiveNotFound { .. }
        | FeedError::StorageNotFound { .. }
        | FeedError::InvalidVersion { .. } => StatusCode::NOT_FOUND,
        FeedError::InvalidLocator { .. } => StatusCode::BAD_REQUEST,
        FeedError::Busy { .. } | FeedError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        FeedError::SourceUnavailable { .. }
        | FeedError::ArchiveBuildFailed { .. }
        | FeedError::Storage { .. }
        | FeedError::Config(_)
        | FeedError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn code_of(err: &FeedError) -> &'static str {
    match err {
        FeedError::AuthenticationDenied { .. } => "unauthorized",
        FeedError::Forbidden { .. } => "forbidden",
        FeedError::PackageNotFound { .. } => "package_not_found",
        FeedError::ReleaseNotFound { .. } | FeedError::InvalidVersion { .. } => "release_not_found",
        FeedError::ArchiveNotFound { .. } | FeedError::StorageNotFound { .. } => "archive_not_found",
        FeedError::InvalidLocator { .. } => "bad_request",
        FeedError::Busy { .. } | FeedError::Timeout { .. } => "busy",
        FeedError::SourceUnavailable { .. } => "source_unavailable",
        FeedError::ArchiveBuildFailed { .. } => "archive_build_failed",
        FeedError::Storage { .. } | FeedError::Config(_) | FeedError::Internal(_) => "internal",
    }
}

fn reason_of(err: &FeedError) -> String {
    match err {
        FeedError::AuthenticationDenied { reason } => reason.clone(),
        FeedError::InvalidLocator { reason, .. } => reason.clone(),
        FeedError::Busy { .. } | FeedError::Timeout { .. } => {
            "release archive is being prepared, retry later".to_string()
        }
        FeedError::SourceUnavailable { .. } => "installed packages could not be listed".to_string(),
        FeedError::ArchiveBuildFailed { slug, version, .. } => {
            format!("could not build archive for {slug} {version}")
        }
        FeedError::Storage { .. } | FeedError::Config(_) | FeedError::Internal(_) => {
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Feed(err) = &self {
            if status == StatusCode::SERVICE_UNAVAILABLE {
                warn!(error = %err, "request deferred");
            } else if status.is_server_error() {
                error!(error = %err, "request failed");
            }
        }

        let mut response = (status, Json(self.body())).into_response();
        let headers = response.headers_mut();
        match status {
            StatusCode::UNAUTHORIZED => {
                if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{REALM}\"")) {
                    headers.insert(header::WWW_AUTHENTICATE, value);
                }
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
            }
            _ => {}
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (FeedError::AuthenticationDenied { reason: "x".into() }, 401),
            (FeedError::Forbidden { slug: "w".into() }, 403),
            (FeedError::PackageNotFound { slug: "w".into() }, 404),
            (
                FeedError::ArchiveNotFound {
                    slug: "w".into(),
                    version: "1.0.0".into(),
                },
                404,
            ),
            (FeedError::Busy { key: "w".into() }, 503),
            (
                FeedError::Timeout {
                    duration: Duration::from_secs(1),
                },
                503,
            ),
            (
                FeedError::SourceUnavailable {
                    source_name: "installed-plugins".into(),
                    message: "permission denied".into(),
                    source: None,
                },
                500,
            ),
            (FeedError::Internal("boom".into()), 500),
        ];
        for (err, expected) in cases {
            assert_eq!(status_of(&err).as_u16(), expected, "{err}");
        }
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = ApiError::Feed(FeedError::AuthenticationDenied {
            reason: "authentication required".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::WWW_AUTHENTICATE],
            "Basic realm=\"pressfeed\""
        );
    }

    #[test]
    fn busy_carries_retry_after() {
        let response = ApiError::Feed(FeedError::Busy { key: "w".into() }).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "5");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = FeedError::Internal("secret path /var/lib".into());
        assert_eq!(reason_of(&err), "internal server error");
        assert_eq!(ApiError::BadRequest("bad type".into()).status(), StatusCode::BAD_REQUEST);
    }
}
