// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication strategies.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use pressfeed_core::Identity;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::debug;

use crate::store::ApiKeyStore;

/// Credentials presented with a request, decoupled from the HTTP stack.
#[derive(Clone, Default)]
pub struct AuthRequest {
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    /// Request path, for logs.
    pub path: String,
}

impl AuthRequest {
    pub fn new(authorization: Option<&str>, path: impl Into<String>) -> Self {
        Self {
            authorization: authorization.map(str::to_string),
            path: path.into(),
        }
    }
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("authorization", &self.authorization.as_ref().map(|_| "[redacted]"))
            .field("path", &self.path)
            .finish()
    }
}

/// What a single strategy concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authenticated(Identity),
    Denied { reason: String },
    /// No opinion; the chain asks the next strategy.
    Pass,
}

impl AuthDecision {
    pub fn denied(reason: impl Into<String>) -> Self {
        AuthDecision::Denied {
            reason: reason.into(),
        }
    }
}

/// One way of authenticating a request.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Stable identifier; registering a second strategy with the same id
    /// replaces the first.
    fn id(&self) -> &str;

    async fn authenticate(&self, request: &AuthRequest) -> AuthDecision;
}

/// Priority of [`ApiKeyStrategy`] in the default chain.
pub const API_KEY_PRIORITY: i32 = 20;

/// Password expected with Basic credentials unless configured otherwise.
pub const DEFAULT_BASIC_PASSWORD: &str = "pressfeed";

/// Accepts `Bearer <token>` or `Basic base64(<token>:<password>)`.
///
/// Composer stores HTTP Basic credentials per host, so the token travels as
/// the user name with a fixed password.
pub struct ApiKeyStrategy {
    store: Arc<dyn ApiKeyStore>,
    password: SecretString,
}

impl ApiKeyStrategy {
    pub const ID: &'static str = "api_key";

    pub fn new(store: Arc<dyn ApiKeyStore>, password: SecretString) -> Self {
        Self { store, password }
    }

    fn password_matches(&self, presented: &str) -> bool {
        let expected = self.password.expose_secret();
        let keyed = |value: &str| {
            let mut mac = Hmac::<Sha256>::new_from_slice(expected.as_bytes()).ok()?;
            mac.update(value.as_bytes());
            Some(mac)
        };
        match (keyed(expected), keyed(presented)) {
            (Some(expected), Some(presented)) => presented
                .verify_slice(&expected.finalize().into_bytes())
                .is_ok(),
            _ => false,
        }
    }

    fn token<'a>(&self, header: &'a str) -> Result<Option<TokenSource<'a>>, &'static str> {
        let (scheme, value) = header.trim().split_once(' ').unwrap_or((header.trim(), ""));
        let value = value.trim();
        if scheme.eq_ignore_ascii_case("bearer") {
            if value.is_empty() {
                return Err("malformed bearer credentials");
            }
            return Ok(Some(TokenSource::Bearer(value)));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(value)
                .map_err(|_| "malformed basic credentials")?;
            let decoded = String::from_utf8(decoded).map_err(|_| "malformed basic credentials")?;
            let (user, password) = decoded
                .split_once(':')
                .ok_or("malformed basic credentials")?;
            if user.is_empty() {
                return Err("malformed basic credentials");
            }
            return Ok(Some(TokenSource::Basic {
                token: user.to_string(),
                password: password.to_string(),
            }));
        }
        Ok(None)
    }
}

enum TokenSource<'a> {
    Bearer(&'a str),
    Basic { token: String, password: String },
}

#[async_trait]
impl AuthStrategy for ApiKeyStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn authenticate(&self, request: &AuthRequest) -> AuthDecision {
        let Some(header) = request.authorization.as_deref() else {
            return AuthDecision::Pass;
        };

        let token = match self.token(header) {
            Ok(Some(TokenSource::Bearer(token))) => token.to_string(),
            Ok(Some(TokenSource::Basic { token, password })) => {
                if !self.password_matches(&password) {
                    debug!(path = %request.path, "basic credentials with wrong password");
                    return AuthDecision::denied("invalid credentials");
                }
                token
            }
            Ok(None) => return AuthDecision::Pass,
            Err(reason) => return AuthDecision::denied(reason),
        };

        match self.store.find(&token) {
            Some(key) => {
                key.touch(Utc::now());
                debug!(key = key.id(), user = key.user(), path = %request.path, "api key accepted");
                AuthDecision::Authenticated(Identity {
                    user: key.user().to_string(),
                    strategy: Self::ID.to_string(),
                })
            }
            None => AuthDecision::denied("invalid API key"),
        }
    }
}

/// Terminal strategy: denies everything that reaches it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnauthorizedStrategy;

impl UnauthorizedStrategy {
    pub const ID: &'static str = "unauthorized";
}

#[async_trait]
impl AuthStrategy for UnauthorizedStrategy {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn authenticate(&self, _request: &AuthRequest) -> AuthDecision {
        AuthDecision::denied("authentication required")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::key::ApiKey;
    use crate::store::FileApiKeyStore;

    fn strategy() -> ApiKeyStrategy {
        let key = ApiKey::new(SecretString::from("tok-alice".to_string()), "alice", Utc::now());
        let store = Arc::new(FileApiKeyStore::from_keys([key]).unwrap());
        ApiKeyStrategy::new(store, SecretString::from(DEFAULT_BASIC_PASSWORD.to_string()))
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    async fn decide(header: Option<&str>) -> AuthDecision {
        strategy()
            .authenticate(&AuthRequest::new(header, "/packages.json"))
            .await
    }

    #[tokio::test]
    async fn bearer_token_authenticates() {
        let decision = decide(Some("Bearer tok-alice")).await;
        assert_eq!(
            decision,
            AuthDecision::Authenticated(Identity {
                user: "alice".into(),
                strategy: "api_key".into(),
            })
        );
        assert!(matches!(decide(Some("bearer tok-alice")).await, AuthDecision::Authenticated(_)));
    }

    #[tokio::test]
    async fn basic_token_with_password_authenticates() {
        let header = basic("tok-alice", "pressfeed");
        assert!(matches!(decide(Some(&header)).await, AuthDecision::Authenticated(_)));

        let wrong = basic("tok-alice", "nope");
        assert_eq!(decide(Some(&wrong)).await, AuthDecision::denied("invalid credentials"));
    }

    #[tokio::test]
    async fn missing_or_foreign_credentials_pass() {
        assert_eq!(decide(None).await, AuthDecision::Pass);
        assert_eq!(decide(Some("Digest username=x")).await, AuthDecision::Pass);
    }

    #[tokio::test]
    async fn unknown_or_malformed_credentials_are_denied() {
        assert_eq!(decide(Some("Bearer tok-mallory")).await, AuthDecision::denied("invalid API key"));
        assert!(matches!(decide(Some("Bearer ")).await, AuthDecision::Denied { .. }));
        assert!(matches!(decide(Some("Basic !!!")).await, AuthDecision::Denied { .. }));
        let no_colon = format!("Basic {}", STANDARD.encode("tok-alice"));
        assert!(matches!(decide(Some(&no_colon)).await, AuthDecision::Denied { .. }));
    }

    #[tokio::test]
    async fn successful_use_touches_key() {
        let key = ApiKey::new(SecretString::from("tok-alice".to_string()), "alice", Utc::now());
        let store = Arc::new(FileApiKeyStore::from_keys([key]).unwrap());
        let strategy = ApiKeyStrategy::new(store.clone(), SecretString::from("pw".to_string()));

        assert!(store.find("tok-alice").unwrap().last_used().is_none());
        strategy
            .authenticate(&AuthRequest::new(Some("Bearer tok-alice"), "/"))
            .await;
        assert!(store.find("tok-alice").unwrap().last_used().is_some());
    }

    #[test]
    fn request_debug_redacts_header() {
        let request = AuthRequest::new(Some("Bearer tok-alice"), "/");
        assert!(!format!("{request:?}").contains("tok-alice"));
    }
}
