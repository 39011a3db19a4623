//! Bearer-token identity resolver.
//!
//! Tokens are configured as a comma-separated list of
//! `token=name[:Role|Role...]` entries, e.g.
//!
//! ```text
//! AUTH_TOKENS=dev-admin=administrator@localhost:Administrator,dev-user=alice
//! ```

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tidy_core::{Credentials, IdentityError, IdentityResolver, Principal};

/// Malformed token configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    /// An entry lacks `=` or has an empty token or name.
    #[error("Malformed token entry \"{0}\", expected token=name[:Role|Role]")]
    Malformed(String),

    /// The same token appears twice.
    #[error("Token for \"{0}\" is configured more than once")]
    Duplicate(String),
}

/// Maps configured bearer tokens to principals.
#[derive(Clone, Default)]
pub struct TokenIdentityResolver {
    tokens: HashMap<String, Principal>,
}

impl TokenIdentityResolver {
    /// Resolver that knows no tokens.
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

    /// Parse a `token=name[:Role|Role]` list. Blank input yields an empty
    /// resolver.
    ///
    /// # Errors
    ///
    /// Returns [`TokenConfigError`] for malformed or duplicate entries.
    pub fn parse(config: &str) -> Result<Self, TokenConfigError> {
        let mut tokens = HashMap::new();
        for entry in config.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let malformed = || TokenConfigError::Malformed(redact(entry));
            let (token, identity) = entry.split_once('=').ok_or_else(malformed)?;
            let (name, roles) = identity.split_once(':').unwrap_or((identity, ""));
            let (token, name) = (token.trim(), name.trim());
            if token.is_empty() || name.is_empty() {
                return Err(malformed());
            }

            let principal = roles
                .split('|')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .fold(Principal::new(name), |principal, role| principal.with_role(role));

            if tokens.insert(token.to_string(), principal).is_some() {
                return Err(TokenConfigError::Duplicate(name.to_string()));
            }
        }
        Ok(Self { tokens })
    }

    /// Number of configured tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Keep the identity part of an entry; never echo the token.
fn redact(entry: &str) -> String {
    match entry.split_once('=') {
        Some((_, identity)) => format!("***={identity}"),
        None => "***".to_string(),
    }
}

impl fmt::Debug for TokenIdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIdentityResolver")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl IdentityResolver for TokenIdentityResolver {
    fn resolve<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Option<Principal>, IdentityError>> {
        let principal = match credentials {
            Credentials::Bearer(token) => self.tokens.get(token).cloned(),
        };
        Box::pin(async move { Ok(principal) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_and_resolve() {
        let resolver = TokenIdentityResolver::parse(
            "t-admin=administrator@localhost:Administrator|Auditor, t-alice=alice",
        )
        .unwrap();

        let admin = resolver
            .resolve(&Credentials::Bearer("t-admin".to_string()))
            .await
            .unwrap()
            .unwrap();
        let alice = resolver
            .resolve(&Credentials::Bearer("t-alice".to_string()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resolver.len(), 2);
        assert_eq!(admin.name(), "administrator@localhost");
        assert!(admin.is_in_role("Administrator"));
        assert!(admin.is_in_role("Auditor"));
        assert!(alice.roles().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token_is_none() {
        let resolver = TokenIdentityResolver::new().with_token("t", Principal::new("bob"));
        let resolved = resolver
            .resolve(&Credentials::Bearer("other".to_string()))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_blank_config_is_empty() {
        assert!(TokenIdentityResolver::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_entry_hides_token() {
        let err = TokenIdentityResolver::parse("secret-token").unwrap_err();
        assert_eq!(err, TokenConfigError::Malformed("***".to_string()));

        let err = TokenIdentityResolver::parse("secret=").unwrap_err();
        assert_eq!(err, TokenConfigError::Malformed("***=".to_string()));
    }

    #[test]
    fn test_duplicate_token() {
        let err = TokenIdentityResolver::parse("t=alice,t=bob").unwrap_err();
        assert_eq!(err, TokenConfigError::Duplicate("bob".to_string()));
    }
}
