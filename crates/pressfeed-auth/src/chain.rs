// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ordered authentication chain.
//!
//! Strategies run in ascending priority; equal priorities keep registration
//! order. The first strategy that authenticates or denies decides. If every
//! strategy passes, the terminal strategy decides, so the chain always ends
//! in a definitive [`AuthOutcome`].

use std::sync::Arc;

use pressfeed_core::AuthOutcome;
use tracing::debug;

use crate::strategy::{AuthDecision, AuthRequest, AuthStrategy, UnauthorizedStrategy};

struct Registered {
    priority: i32,
    strategy: Arc<dyn AuthStrategy>,
}

/// Builder for [`AuthChain`].
pub struct AuthChainBuilder {
    strategies: Vec<Registered>,
    terminal: Arc<dyn AuthStrategy>,
}

impl AuthChainBuilder {
    /// Adds `strategy` at `priority`. A strategy already registered under
    /// the same id is removed first.
    pub fn register(mut self, priority: i32, strategy: Arc<dyn AuthStrategy>) -> Self {
        self.strategies.retain(|r| r.strategy.id() != strategy.id());
        self.strategies.push(Registered { priority, strategy });
        self
    }

    /// Replaces the strategy consulted when all others pass.
    pub fn terminal(mut self, strategy: Arc<dyn AuthStrategy>) -> Self {
        self.terminal = strategy;
        self
    }

    pub fn build(mut self) -> AuthChain {
        // Stable sort: equal priorities keep registration order.
        self.strategies.sort_by_key(|r| r.priority);
        AuthChain {
            strategies: self.strategies,
            terminal: self.terminal,
        }
    }
}

/// An immutable, ordered list of strategies.
pub struct AuthChain {
    strategies: Vec<Registered>,
    terminal: Arc<dyn AuthStrategy>,
}

impl std::fmt::Debug for AuthChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthChain")
            .field("order", &self.order())
            .finish()
    }
}

impl AuthChain {
    pub fn builder() -> AuthChainBuilder {
        AuthChainBuilder {
            strategies: Vec::new(),
            terminal: Arc::new(UnauthorizedStrategy),
        }
    }

    /// Strategy ids in evaluation order, terminal last.
    pub fn order(&self) -> Vec<&str> {
        self.strategies
            .iter()
            .map(|r| r.strategy.id())
            .chain(std::iter::once(self.terminal.id()))
            .collect()
    }

    pub async fn authenticate(&self, request: &AuthRequest) -> AuthOutcome {
        let strategies = self
            .strategies
            .iter()
            .map(|r| &r.strategy)
            .chain(std::iter::once(&self.terminal));

        for strategy in strategies {
            match strategy.authenticate(request).await {
                AuthDecision::Authenticated(identity) => {
                    pressfeed_prometheus::record_auth(strategy.id(), "authenticated");
                    debug!(strategy = strategy.id(), user = %identity.user, "request authenticated");
                    return AuthOutcome::Authenticated(identity);
                }
                AuthDecision::Denied { reason } => {
                    pressfeed_prometheus::record_auth(strategy.id(), "denied");
                    debug!(strategy = strategy.id(), reason = %reason, path = %request.path, "request denied");
                    return AuthOutcome::Denied { reason };
                }
                AuthDecision::Pass => {}
            }
        }

        // A terminal strategy that passes still must not let the request through.
        pressfeed_prometheus::record_auth(self.terminal.id(), "denied");
        AuthOutcome::Denied {
            reason: "authentication required".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pressfeed_core::Identity;

    use super::*;

    /// Returns a fixed decision.
    struct Fixed {
        id: &'static str,
        decision: AuthDecision,
    }

    #[async_trait]
    impl AuthStrategy for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        async fn authenticate(&self, _request: &AuthRequest) -> AuthDecision {
            self.decision.clone()
        }
    }

    fn fixed(id: &'static str, decision: AuthDecision) -> Arc<dyn AuthStrategy> {
        Arc::new(Fixed { id, decision })
    }

    fn allow(user: &str) -> AuthDecision {
        AuthDecision::Authenticated(Identity {
            user: user.to_string(),
            strategy: "test".to_string(),
        })
    }

    #[tokio::test]
    async fn empty_chain_denies() {
        let chain = AuthChain::builder().build();
        let outcome = chain.authenticate(&AuthRequest::default()).await;
        assert_eq!(
            outcome,
            AuthOutcome::Denied {
                reason: "authentication required".into()
            }
        );
        assert_eq!(chain.order(), vec!["unauthorized"]);
    }

    #[tokio::test]
    async fn lower_priority_runs_first() {
        let chain = AuthChain::builder()
            .register(50, fixed("late", allow("late")))
            .register(10, fixed("early", allow("early")))
            .build();
        assert_eq!(chain.order(), vec!["early", "late", "unauthorized"]);
        match chain.authenticate(&AuthRequest::default()).await {
            AuthOutcome::Authenticated(identity) => assert_eq!(identity.user, "early"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn equal_priority_keeps_registration_order() {
        let chain = AuthChain::builder()
            .register(20, fixed("b", AuthDecision::Pass))
            .register(20, fixed("a", AuthDecision::Pass))
            .register(20, fixed("c", AuthDecision::Pass))
            .build();
        assert_eq!(chain.order(), vec!["b", "a", "c", "unauthorized"]);
    }

    #[tokio::test]
    async fn re_registering_replaces_strategy() {
        let chain = AuthChain::builder()
            .register(10, fixed("key", AuthDecision::denied("old")))
            .register(30, fixed("other", AuthDecision::Pass))
            .register(40, fixed("key", allow("new")))
            .build();
        assert_eq!(chain.order(), vec!["other", "key", "unauthorized"]);
        assert!(chain.authenticate(&AuthRequest::default()).await.is_authenticated());
    }

    #[tokio::test]
    async fn denial_stops_the_chain() {
        let chain = AuthChain::builder()
            .register(10, fixed("deny", AuthDecision::denied("nope")))
            .register(20, fixed("allow", allow("x")))
            .build();
        assert_eq!(
            chain.authenticate(&AuthRequest::default()).await,
            AuthOutcome::Denied { reason: "nope".into() }
        );
    }

    #[tokio::test]
    async fn passing_terminal_still_denies() {
        let chain = AuthChain::builder()
            .terminal(fixed("lenient", AuthDecision::Pass))
            .build();
        assert!(!chain.authenticate(&AuthRequest::default()).await.is_authenticated());
    }
}
