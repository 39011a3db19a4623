//! Rate limiting value types.
//!
//! The limiter itself lives in the runtime crate; these are the types it
//! shares with the web layer: the [`RateLimitPolicy`] it enforces, the
//! [`PartitionKey`] requests are grouped by, and the [`Admission`] verdict.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Sentinel partition for callers with neither identity nor origin.
pub const ANONYMOUS_PARTITION: &str = "anonymous";

/// Fixed-window quota.
///
/// The counter resets hard at every window boundary; there is no
/// leaky-bucket or token-bucket smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum admitted requests per partition per window.
    pub permit_limit: u32,
    /// Length of one window.
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(permit_limit: u32, window: Duration) -> Self {
        Self {
            permit_limit,
            window,
        }
    }
}

impl Default for RateLimitPolicy {
    /// 100 requests per minute.
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

/// Identity string requests are grouped by for rate limiting.
///
/// Precedence: authenticated principal name, then network origin, then
/// [`ANONYMOUS_PARTITION`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Derive the key from whatever the request context knows about its
    /// caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidy_core::rate_limit::PartitionKey;
    /// use std::net::{IpAddr, Ipv4Addr};
    ///
    /// let origin = Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)));
    /// assert_eq!(PartitionKey::resolve(Some("alice"), origin).as_str(), "alice");
    /// assert_eq!(PartitionKey::resolve(None, origin).as_str(), "203.0.113.9");
    /// assert_eq!(PartitionKey::resolve(None, None).as_str(), "anonymous");
    /// ```
    #[must_use]
    pub fn resolve(principal_name: Option<&str>, origin: Option<IpAddr>) -> Self {
        match (principal_name, origin) {
            (Some(name), _) if !name.is_empty() => Self(name.to_string()),
            (_, Some(ip)) => Self(ip.to_string()),
            _ => Self(ANONYMOUS_PARTITION.to_string()),
        }
    }

    /// Borrow the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartitionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request fits in the current window.
    Allowed,
    /// The quota is exhausted until the window resets.
    Rejected {
        /// Time left until the current window ends.
        retry_after: Duration,
    },
}

impl Admission {
    /// Whether the request was admitted.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.permit_limit, 100);
        assert_eq!(policy.window, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_principal_name_falls_back_to_origin() {
        let origin = Some(IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(PartitionKey::resolve(Some(""), origin).as_str(), "::1");
    }

    #[test]
    fn test_admission_is_allowed() {
        assert!(Admission::Allowed.is_allowed());
        assert!(
            !Admission::Rejected {
                retry_after: Duration::from_secs(1)
            }
            .is_allowed()
        );
    }
}
