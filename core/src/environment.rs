//! Dependency injection traits.
//!
//! Every external collaborator the request-processing core talks to is
//! hidden behind a narrow trait here and passed in explicitly by the
//! application at construction time:
//!
//! - [`Clock`]: wall-clock time (rate limiting, timestamps)
//! - [`Persistence`]: unit-of-work commit (`save_changes`)
//! - [`IdentityResolver`]: credentials → [`Principal`]
//!
//! Traits whose implementations are stored as `Arc<dyn _>` return
//! [`BoxFuture`] instead of using `async fn` so they stay dyn-compatible.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use tidy_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let earlier = clock.now();
/// assert!(clock.now() >= earlier);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Errors reported by the persistence collaborator.
#[derive(Error, Debug, Clone)]
pub enum PersistenceError {
    /// The backing store could not be reached.
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),

    /// A staged change conflicts with the stored state.
    #[error("Persistence conflict: {0}")]
    Conflict(String),
}

/// Unit-of-work commit capability.
///
/// Command handlers stage their mutations on a session and then call
/// `save_changes` once; the core does not know the storage format.
pub trait Persistence: Send + Sync {
    /// Commit all staged changes atomically.
    ///
    /// Returns the number of entities written.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the store rejects or cannot apply the
    /// changes. Nothing is retried.
    fn save_changes(&self) -> BoxFuture<'_, Result<usize, PersistenceError>>;
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    name: String,
    roles: Vec<String>,
}

impl Principal {
    /// Create a principal without roles.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
        }
    }

    /// Add a role to the principal.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// The identity name, used as the rate-limit partition key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Roles granted to the principal.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Whether the principal holds `role`.
    #[must_use]
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Credentials presented by a caller.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

// Tokens never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Credentials::Bearer(<redacted>)"),
        }
    }
}

/// Errors reported by the identity collaborator.
///
/// Invalid credentials are not an error: resolvers return `Ok(None)` and the
/// caller stays anonymous. Errors mean the provider itself failed.
#[derive(Error, Debug, Clone)]
pub enum IdentityError {
    /// The identity provider could not be reached.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves presented credentials to a principal.
pub trait IdentityResolver: Send + Sync {
    /// Resolve `credentials` to a principal.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] only when the provider fails; unknown or
    /// invalid credentials resolve to `Ok(None)`.
    fn resolve<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<Option<Principal>, IdentityError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_roles() {
        let admin = Principal::new("administrator@localhost").with_role("Administrator");
        assert!(admin.is_in_role("Administrator"));
        assert!(!admin.is_in_role("Auditor"));
        assert_eq!(admin.to_string(), "administrator@localhost");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = Credentials::Bearer("s3cret".to_string());
        assert!(!format!("{credentials:?}").contains("s3cret"));
    }
}
