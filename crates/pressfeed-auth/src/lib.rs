// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for pressfeed.
//!
//! Requests are checked by an [`AuthChain`] of [`AuthStrategy`]
//! implementations. The stock chain accepts API keys from a
//! [`FileApiKeyStore`] and denies everything else.

pub mod chain;
pub mod key;
pub mod store;
pub mod strategy;

use std::sync::Arc;

use secrecy::SecretString;

pub use chain::{AuthChain, AuthChainBuilder};
pub use key::{ApiKey, KeyFile, KeyRecord};
pub use store::{ApiKeyStore, FileApiKeyStore};
pub use strategy::{
    API_KEY_PRIORITY, ApiKeyStrategy, AuthDecision, AuthRequest, AuthStrategy,
    DEFAULT_BASIC_PASSWORD, UnauthorizedStrategy,
};

/// The default chain: API keys at [`API_KEY_PRIORITY`], then denial.
pub fn default_chain(store: Arc<dyn ApiKeyStore>, basic_password: SecretString) -> AuthChain {
    AuthChain::builder()
        .register(
            API_KEY_PRIORITY,
            Arc::new(ApiKeyStrategy::new(store, basic_password)),
        )
        .build()
}
