// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup of API keys by presented token.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use pressfeed_core::FeedError;
use rand::RngCore;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{info, warn};

use crate::key::{ApiKey, KeyFile};

type HmacSha256 = Hmac<Sha256>;

/// Source of API keys for [`crate::ApiKeyStrategy`].
pub trait ApiKeyStore: Send + Sync {
    /// Finds the key whose token equals `token`, comparing in constant time.
    fn find(&self, token: &str) -> Option<Arc<ApiKey>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A key plus the keyed digest of its token.
struct Entry {
    digest: Vec<u8>,
    key: Arc<ApiKey>,
}

/// Keys loaded from a TOML file of `[[keys]]` tables.
///
/// Tokens are compared as HMAC-SHA256 digests under a per-process random
/// key, so neither timing nor token length leaks through the comparison.
/// [`FileApiKeyStore::reload`] swaps the key set atomically; last-used
/// timestamps survive reloads.
pub struct FileApiKeyStore {
    path: Option<PathBuf>,
    mac: HmacSha256,
    entries: ArcSwap<Vec<Entry>>,
}

impl std::fmt::Debug for FileApiKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileApiKeyStore")
            .field("path", &self.path)
            .field("keys", &self.len())
            .finish_non_exhaustive()
    }
}

impl FileApiKeyStore {
    /// Opens the key file at `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FeedError> {
        let store = Self::empty(Some(path.into()))?;
        store.reload()?;
        Ok(store)
    }

    /// A store holding exactly `keys`, with no backing file.
    pub fn from_keys(keys: impl IntoIterator<Item = ApiKey>) -> Result<Self, FeedError> {
        let store = Self::empty(None)?;
        let entries = keys
            .into_iter()
            .map(|key| store.entry(Arc::new(key)))
            .collect();
        store.entries.store(Arc::new(entries));
        Ok(store)
    }

    fn empty(path: Option<PathBuf>) -> Result<Self, FeedError> {
        let mut mac_key = [0u8; 32];
        OsRng.fill_bytes(&mut mac_key);
        let mac = HmacSha256::new_from_slice(&mac_key)
            .map_err(|e| FeedError::Internal(format!("hmac init failed: {e}")))?;
        Ok(Self {
            path,
            mac,
            entries: ArcSwap::from_pointee(Vec::new()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-reads the key file. On error the current keys stay in place.
    pub fn reload(&self) -> Result<usize, FeedError> {
        let Some(path) = &self.path else {
            return Ok(self.len());
        };
        let file = read_key_file(path)?;

        let previous: HashMap<String, Option<DateTime<Utc>>> = self
            .entries
            .load()
            .iter()
            .map(|entry| (entry.key.id().to_string(), entry.key.last_used()))
            .collect();

        let mut entries = Vec::with_capacity(file.keys.len());
        for record in file.keys {
            let created_at = DateTime::parse_from_rfc3339(&record.created_at)
                .map_err(|e| {
                    FeedError::Config(format!(
                        "invalid created_at for key of user {:?} in {}: {e}",
                        record.user,
                        path.display()
                    ))
                })?
                .with_timezone(&Utc);
            if record.token.trim().is_empty() {
                return Err(FeedError::Config(format!(
                    "empty token for key of user {:?} in {}",
                    record.user,
                    path.display()
                )));
            }
            let key = ApiKey::new(SecretString::from(record.token), record.user, created_at);
            if let Some(Some(at)) = previous.get(key.id()) {
                key.touch(*at);
            }
            entries.push(self.entry(Arc::new(key)));
        }

        let count = entries.len();
        self.entries.store(Arc::new(entries));
        info!(path = %path.display(), keys = count, "api keys loaded");
        Ok(count)
    }

    fn digest(&self, token: &str) -> Vec<u8> {
        self.mac(token).finalize().into_bytes().to_vec()
    }

    fn mac(&self, token: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac
    }

    fn entry(&self, key: Arc<ApiKey>) -> Entry {
        Entry {
            digest: self.digest(key.token().expose_secret()),
            key,
        }
    }
}

impl ApiKeyStore for FileApiKeyStore {
    fn find(&self, token: &str) -> Option<Arc<ApiKey>> {
        let entries = self.entries.load();
        let mut found = None;
        // Every entry is checked so the scan length does not depend on
        // which key matched.
        for entry in entries.iter() {
            if self.mac(token).verify_slice(&entry.digest).is_ok() && found.is_none() {
                found = Some(Arc::clone(&entry.key));
            }
        }
        found
    }

    fn len(&self) -> usize {
        self.entries.load().len()
    }
}

fn read_key_file(path: &Path) -> Result<KeyFile, FeedError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "api key file not found, no keys loaded");
            return Ok(KeyFile::default());
        }
        Err(e) => {
            return Err(FeedError::Config(format!(
                "cannot read api key file {}: {e}",
                path.display()
            )));
        }
    };
    toml::from_str(&raw)
        .map_err(|e| FeedError::Config(format!("invalid api key file {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(token: &str, user: &str) -> ApiKey {
        ApiKey::new(SecretString::from(token.to_string()), user, Utc::now())
    }

    #[test]
    fn finds_matching_token_only() {
        let store = FileApiKeyStore::from_keys([key("tok-alice", "alice"), key("tok-bob", "bob")]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.find("tok-bob").unwrap().user(), "bob");
        assert!(store.find("tok-bo").is_none());
        assert!(store.find("").is_none());
    }

    #[test]
    fn loads_and_reloads_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.toml");
        std::fs::write(
            &path,
            "[[keys]]\ntoken = \"tok-alice\"\nuser = \"alice\"\ncreated_at = \"2026-01-02T03:04:05Z\"\n",
        )
        .unwrap();

        let store = FileApiKeyStore::open(&path).unwrap();
        let alice = store.find("tok-alice").unwrap();
        assert_eq!(alice.created_at().to_rfc3339(), "2026-01-02T03:04:05+00:00");
        let used = Utc::now();
        alice.touch(used);

        std::fs::write(
            &path,
            "[[keys]]\ntoken = \"tok-alice\"\nuser = \"alice\"\ncreated_at = \"2026-01-02T03:04:05Z\"\n\n\
             [[keys]]\ntoken = \"tok-carol\"\nuser = \"carol\"\ncreated_at = \"2026-02-01T00:00:00Z\"\n",
        )
        .unwrap();
        assert_eq!(store.reload().unwrap(), 2);
        assert_eq!(store.find("tok-alice").unwrap().last_used(), Some(used));
        assert_eq!(store.find("tok-carol").unwrap().user(), "carol");
    }

    #[test]
    fn broken_file_keeps_current_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.toml");
        std::fs::write(
            &path,
            "[[keys]]\ntoken = \"tok-alice\"\nuser = \"alice\"\ncreated_at = \"2026-01-02T03:04:05Z\"\n",
        )
        .unwrap();
        let store = FileApiKeyStore::open(&path).unwrap();

        std::fs::write(&path, "[[keys]]\ntoken = \"x\"\nuser = \"y\"\ncreated_at = \"yesterday\"\n").unwrap();
        assert!(matches!(store.reload(), Err(FeedError::Config(_))));
        assert!(store.find("tok-alice").is_some());
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileApiKeyStore::open(dir.path().join("absent.toml")).unwrap();
        assert!(store.is_empty());
    }
}
