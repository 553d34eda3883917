// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers.
//!
//! - `GET /packages.json[?type=plugin|theme]`
//! - `GET /download/{slug}/{version}`
//! - `GET /health`, `GET /metrics`

use std::io::ErrorKind;
use std::str::FromStr;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pressfeed_core::{FeedError, PackageKind, Release, Repository, VersionParser};
use pressfeed_repository::{PackageQuery, QueryRepository};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::{ApiError, ErrorBody};
use crate::server::GatewayState;

const JSON: &str = "application/json";
const ZIP: &str = "application/zip";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /packages.json
pub async fn get_feed(
    State(state): State<GatewayState>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Response {
    let response = match feed(&state, params, &headers).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    pressfeed_prometheus::record_feed_request(response.status().as_u16());
    response
}

async fn feed(state: &GatewayState, params: FeedParams, headers: &HeaderMap) -> Result<Response, ApiError> {
    let kind = params
        .kind
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            PackageKind::from_str(raw)
                .map_err(|_| ApiError::BadRequest(format!("unknown package type `{raw}`")))
        })
        .transpose()?;

    let document = match kind {
        Some(kind) => {
            let view = QueryRepository::new(state.repository.clone(), PackageQuery::kind(kind));
            state.transformer.transform(&view).await?
        }
        None => {
            let document = state.transformer.transform(state.repository.as_ref()).await?;
            pressfeed_prometheus::set_packages_visible(document.packages.len());
            document
        }
    };
    let body = serde_json::to_vec(&document)
        .map_err(|e| FeedError::Internal(format!("feed serialization failed: {e}")))?;

    let etag = format!("\"{}\"", hex::encode(Sha256::digest(&body)));
    if etag_matches(headers, &etag) {
        debug!("feed unchanged, answering 304");
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, JSON.to_string()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "private, no-cache".to_string()),
        ],
        body,
    )
        .into_response())
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .split(',')
                .map(str::trim)
                .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == etag)
        })
}

/// GET /download/{slug}/{version}
pub async fn get_download(
    State(state): State<GatewayState>,
    Path((slug, version)): Path<(String, String)>,
) -> Response {
    let response = match download(&state, &slug, &version).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    pressfeed_prometheus::record_download(response.status().as_u16());
    response
}

async fn download(state: &GatewayState, slug: &str, raw_version: &str) -> Result<Response, ApiError> {
    let release_not_found = || FeedError::ReleaseNotFound {
        slug: slug.to_string(),
        version: raw_version.to_string(),
    };
    let version = VersionParser::new()
        .parse(raw_version)
        .map_err(|_| release_not_found())?;

    let Some(package) = state.repository.get_package(slug).await? else {
        return Err(hidden(state, slug).await?.into());
    };

    let live = package.release(&version).is_some_and(Release::is_live);
    let archive = state
        .releases
        .get_archive(&package, &version)
        .await
        .inspect_err(|err| {
            if live && matches!(err, FeedError::ReleaseNotFound { .. }) {
                state.repository.invalidate();
            }
        })?;
    if archive.superseded {
        state.repository.invalidate();
    }
    let file = tokio::fs::File::open(&archive.path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => FeedError::ArchiveNotFound {
            slug: slug.to_string(),
            version: version.to_string(),
        },
        _ => FeedError::storage(e),
    })?;
    // Length of the file actually opened; a rebuild may have replaced the path.
    let length = file.metadata().await.map_err(FeedError::storage)?.len();

    info!(package = %package.id(), version = %version, bytes = length, "serving archive");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", archive.file_name))
        .map_err(|e| FeedError::Internal(format!("invalid file name header: {e}")))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(ZIP)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Error for a slug that is not visible: 404 unless the operator opted
/// into revealing installed but non-whitelisted packages with 403.
async fn hidden(state: &GatewayState, slug: &str) -> Result<FeedError, FeedError> {
    if !state.hide_forbidden && state.repository.is_installed(slug).await? {
        return Ok(FeedError::Forbidden {
            slug: slug.to_string(),
        });
    }
    Ok(FeedError::PackageNotFound {
        slug: slug.to_string(),
    })
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_TEXT)],
            render(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "not_found".to_string(),
                reason: "metrics are disabled".to_string(),
            }),
        )
            .into_response(),
    }
}
