//! Authorization.
//!
//! An [`AuthorizationPolicy`] is an ordered list of rules, each matching a
//! path prefix and optionally a method. The first matching rule decides;
//! requests no rule matches are allowed.

use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tidy_core::Principal;

/// What a rule requires of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    /// Anyone, including anonymous callers.
    Anonymous,
    /// Any authenticated caller.
    Authenticated,
    /// An authenticated caller holding the role.
    Role(String),
}

/// Outcome of evaluating a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Continue to the endpoint.
    Allow,
    /// Authentication required (401).
    Challenge,
    /// Authenticated but not permitted (403).
    Forbid,
}

#[derive(Debug, Clone)]
struct Rule {
    method: Option<Method>,
    prefix: String,
    access: AccessRule,
}

impl Rule {
    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().is_none_or(|m| m == method) && path_has_prefix(path, &self.prefix)
    }
}

/// Ordered access rules.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    rules: Vec<Rule>,
}

impl AuthorizationPolicy {
    /// Policy with no rules (everything allowed).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for every method under `prefix`.
    #[must_use]
    pub fn rule(self, prefix: impl Into<String>, access: AccessRule) -> Self {
        self.push(None, prefix.into(), access)
    }

    /// Append a rule for `method` requests under `prefix`.
    #[must_use]
    pub fn rule_for(self, method: Method, prefix: impl Into<String>, access: AccessRule) -> Self {
        self.push(Some(method), prefix.into(), access)
    }

    fn push(mut self, method: Option<Method>, prefix: String, access: AccessRule) -> Self {
        self.rules.push(Rule {
            method,
            prefix,
            access,
        });
        self
    }

    /// Decide on a request.
    #[must_use]
    pub fn evaluate(&self, method: &Method, path: &str, principal: Option<&Principal>) -> Decision {
        let Some(rule) = self.rules.iter().find(|r| r.matches(method, path)) else {
            return Decision::Allow;
        };

        match (&rule.access, principal) {
            (AccessRule::Anonymous, _) => Decision::Allow,
            (_, None) => Decision::Challenge,
            (AccessRule::Authenticated, Some(_)) => Decision::Allow,
            (AccessRule::Role(role), Some(principal)) => {
                if principal.is_in_role(role) {
                    Decision::Allow
                } else {
                    Decision::Forbid
                }
            }
        }
    }
}

/// Prefix match on whole path segments, ignoring ASCII case.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    let Some(head) = path.get(..prefix.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(prefix)
        && matches!(path.as_bytes().get(prefix.len()), None | Some(b'/'))
}

/// Enforce `policy` on the request.
///
/// # Errors
///
/// - 401 [`AppError`] when the rule needs a caller and the request is
///   anonymous.
/// - 403 [`AppError`] when the caller lacks the required role.
pub async fn authorize(
    State(policy): State<Arc<AuthorizationPolicy>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let decision = policy.evaluate(
        request.method(),
        request.uri().path(),
        request.extensions().get::<Principal>(),
    );

    match decision {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Challenge => Err(AppError::unauthorized("Authentication is required")),
        Decision::Forbid => Err(AppError::forbidden(
            "You do not have permission to access this resource",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AuthorizationPolicy {
        AuthorizationPolicy::new()
            .rule_for(
                Method::POST,
                "/api/TodoLists/purge",
                AccessRule::Role("Administrator".to_string()),
            )
            .rule("/api", AccessRule::Authenticated)
            .rule("/health", AccessRule::Anonymous)
    }

    #[test]
    fn test_anonymous_api_is_challenged() {
        assert_eq!(
            policy().evaluate(&Method::GET, "/api/TodoLists", None),
            Decision::Challenge
        );
    }

    #[test]
    fn test_authenticated_api_is_allowed() {
        let alice = Principal::new("alice");
        assert_eq!(
            policy().evaluate(&Method::GET, "/api/TodoItems", Some(&alice)),
            Decision::Allow
        );
    }

    #[test]
    fn test_role_rule_forbids_without_role() {
        let alice = Principal::new("alice");
        let admin = Principal::new("root").with_role("Administrator");

        assert_eq!(
            policy().evaluate(&Method::POST, "/api/TodoLists/purge", Some(&alice)),
            Decision::Forbid
        );
        assert_eq!(
            policy().evaluate(&Method::POST, "/api/TodoLists/purge", Some(&admin)),
            Decision::Allow
        );
    }

    #[test]
    fn test_method_scoped_rule_falls_through() {
        let alice = Principal::new("alice");
        assert_eq!(
            policy().evaluate(&Method::GET, "/api/TodoLists/purge", Some(&alice)),
            Decision::Allow
        );
    }

    #[test]
    fn test_unmatched_path_is_allowed() {
        assert_eq!(policy().evaluate(&Method::GET, "/apiary", None), Decision::Allow);
        assert_eq!(policy().evaluate(&Method::GET, "/", None), Decision::Allow);
    }

    #[test]
    fn test_prefix_ignores_case() {
        assert_eq!(
            policy().evaluate(&Method::GET, "/API/todolists", None),
            Decision::Challenge
        );
    }
}
