// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API keys: opaque bearer tokens owned by a user.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Random bytes in a generated token.
const TOKEN_BYTES: usize = 24;

/// A credential granting access to the feed. Authentication only; a key
/// carries no permissions beyond "may read".
pub struct ApiKey {
    id: String,
    token: SecretString,
    user: String,
    created_at: DateTime<Utc>,
    last_used: ArcSwapOption<DateTime<Utc>>,
}

impl ApiKey {
    pub fn new(token: SecretString, user: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let digest = Sha256::digest(token.expose_secret().as_bytes());
        Self {
            id: hex::encode(&digest[..6]),
            token,
            user: user.into(),
            created_at,
            last_used: ArcSwapOption::empty(),
        }
    }

    /// A fresh random key for `user`, created now.
    pub fn generate(user: impl Into<String>) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self::new(SecretString::from(hex::encode(bytes)), user, Utc::now())
    }

    /// Short non-secret identifier derived from the token, for logs.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used(&self) -> Option<DateTime<Utc>> {
        self.last_used.load().as_deref().copied()
    }

    pub fn touch(&self, at: DateTime<Utc>) {
        self.last_used.store(Some(Arc::new(at)));
    }

    /// The key as a `[[keys]]` entry of the key file.
    pub fn to_record(&self) -> KeyRecord {
        KeyRecord {
            token: self.token.expose_secret().to_string(),
            user: self.user.clone(),
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("token", &"[redacted]")
            .field("user", &self.user)
            .field("created_at", &self.created_at)
            .field("last_used", &self.last_used())
            .finish()
    }
}

/// One `[[keys]]` table of the key file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyRecord {
    pub token: String,
    pub user: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("token", &"[redacted]")
            .field("user", &self.user)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// The whole key file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyFile {
    #[serde(default)]
    pub keys: Vec<KeyRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique_hex() {
        let a = ApiKey::generate("alice");
        let b = ApiKey::generate("alice");
        assert_ne!(a.token().expose_secret(), b.token().expose_secret());
        assert_eq!(a.token().expose_secret().len(), TOKEN_BYTES * 2);
        assert!(a.token().expose_secret().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn debug_redacts_token() {
        let key = ApiKey::new(SecretString::from("s3cret-token".to_string()), "alice", Utc::now());
        let debug = format!("{key:?}");
        assert!(!debug.contains("s3cret-token"));
        assert!(debug.contains("[redacted]"));
        assert!(!format!("{:?}", key.to_record()).contains("s3cret-token"));
    }

    #[test]
    fn touch_records_last_use() {
        let key = ApiKey::generate("alice");
        assert!(key.last_used().is_none());
        let now = Utc::now();
        key.touch(now);
        assert_eq!(key.last_used(), Some(now));
    }

    #[test]
    fn record_renders_as_toml_table() {
        let key = ApiKey::generate("alice");
        let file = KeyFile {
            keys: vec![key.to_record()],
        };
        let rendered = toml::to_string(&file).unwrap();
        assert!(rendered.contains("[[keys]]"));
        assert!(rendered.contains("user = \"alice\""));
        let parsed: KeyFile = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.keys[0], key.to_record());
    }
}
