// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware.
//!
//! Runs the [`AuthChain`] for every protected route. On success the
//! caller's [`Identity`] is attached to the request extensions; otherwise
//! the request is answered with 401.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use pressfeed_auth::{AuthChain, AuthRequest};
use pressfeed_core::{AuthOutcome, FeedError, Identity};

use crate::error::ApiError;

pub async fn auth_middleware(
    State(chain): State<Arc<AuthChain>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let auth_request = AuthRequest::new(authorization, request.uri().path());

    match chain.authenticate(&auth_request).await {
        AuthOutcome::Authenticated(identity) => {
            request.extensions_mut().insert::<Identity>(identity);
            next.run(request).await
        }
        AuthOutcome::Denied { reason } => {
            ApiError::Feed(FeedError::AuthenticationDenied { reason }).into_response()
        }
    }
}
