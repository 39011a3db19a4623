//! Identity collaborator doubles.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tidy_core::{Credentials, IdentityError, IdentityResolver, Principal};

/// Resolves a fixed set of bearer tokens and counts every call.
///
/// The call counter lets pipeline tests prove a request never reached the
/// authentication stage.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    tokens: HashMap<String, Principal>,
    calls: Arc<AtomicUsize>,
}

impl StaticIdentityResolver {
    /// Create a resolver that knows no tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `principal`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }

    /// Number of `resolve` calls so far, across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn resolve<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Option<Principal>, IdentityError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let principal = match credentials {
            Credentials::Bearer(token) => self.tokens.get(token).cloned(),
        };
        Box::pin(async move { Ok(principal) })
    }
}

/// Resolver whose provider is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingIdentityResolver;

impl IdentityResolver for FailingIdentityResolver {
    fn resolve<'a>(
        &'a self,
        _credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Option<Principal>, IdentityError>> {
        Box::pin(async { Err(IdentityError::Unavailable("provider offline".to_string())) })
    }
}
