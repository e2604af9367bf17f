//! Authorization matrix.
//!
//! A static, ordered table of `(method, path pattern) -> requirement` rules.
//! The first matching rule decides; a request no rule matches is denied.

use axum::http::Method;

use super::{
    credentials::AuthRejection,
    principal::{Principal, ROLE_ADMIN, ROLE_USER},
};

/// Ant-style path pattern: `*` matches one segment, a trailing `**` matches
/// the rest of the path (including nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern(String);

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut pattern = segments(&self.0);
        let mut path = segments(path);

        loop {
            match (pattern.next(), path.next()) {
                (Some("**"), _) => return true,
                (Some("*"), Some(_)) => {}
                (Some(expected), Some(actual)) if expected == actual => {}
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    Any,
    Only(Method),
}

impl MethodPattern {
    fn matches(&self, method: &Method) -> bool {
        match self {
            MethodPattern::Any => true,
            MethodPattern::Only(expected) => expected == method,
        }
    }
}

/// What a caller must satisfy for a rule to let the request through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Role(String),
    Authenticated,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub method: MethodPattern,
    pub path: PathPattern,
    pub requirement: Requirement,
}

impl RouteRule {
    pub fn new(method: MethodPattern, path: &str, requirement: Requirement) -> Self {
        Self {
            method,
            path: PathPattern::new(path),
            requirement,
        }
    }

    fn role(method: Method, path: &str, role: &str) -> Self {
        Self::new(
            MethodPattern::Only(method),
            path,
            Requirement::Role(role.to_string()),
        )
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method) && self.path.matches(path)
    }
}

/// Refusal surfaced to the client as 401 or 403
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No identity could be established
    Unauthorized,
    /// An identity exists but the rule refuses it
    Forbidden(AuthRejection),
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationMatrix {
    rules: Vec<RouteRule>,
}

impl AuthorizationMatrix {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Reads need USER, every write needs ADMIN
    pub fn api_rules() -> Self {
        Self::new(vec![
            RouteRule::role(Method::GET, "/api/**", ROLE_USER),
            RouteRule::role(Method::POST, "/api/**", ROLE_ADMIN),
            RouteRule::role(Method::PUT, "/api/**", ROLE_ADMIN),
            RouteRule::role(Method::PATCH, "/api/**", ROLE_ADMIN),
            RouteRule::role(Method::DELETE, "/api/**", ROLE_ADMIN),
        ])
    }

    pub fn users_rules() -> Self {
        Self::new(vec![
            RouteRule::new(MethodPattern::Any, "/users/get-token", Requirement::Authenticated),
            RouteRule::new(
                MethodPattern::Only(Method::POST),
                "/users/rotate-secret",
                Requirement::Authenticated,
            ),
            RouteRule::new(MethodPattern::Any, "/users/register", Requirement::Anonymous),
        ])
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matches(method, path))
    }

    pub fn evaluate(
        &self,
        method: &Method,
        path: &str,
        principal: Option<&Principal>,
    ) -> Result<(), Denial> {
        let requirement = self.find(method, path).map(|rule| &rule.requirement);

        match (requirement, principal) {
            (Some(Requirement::Anonymous), None) => Ok(()),
            (Some(Requirement::Anonymous), Some(_)) => Err(Denial::Forbidden(
                AuthRejection::AlreadyAuthenticatedOnAnonymousRoute,
            )),
            (_, None) => Err(Denial::Unauthorized),
            (Some(Requirement::Authenticated), Some(_)) => Ok(()),
            (Some(Requirement::Role(role)), Some(principal)) if principal.has_role(role) => Ok(()),
            (Some(Requirement::Role(_)), Some(_)) | (None, Some(_)) => {
                Err(Denial::Forbidden(AuthRejection::InsufficientRole))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn principal(roles: &[&str]) -> Principal {
        Principal::new(
            "alice",
            roles.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
        )
    }

    #[test]
    fn test_path_pattern() {
        let api = PathPattern::new("/api/**");
        assert!(api.matches("/api"));
        assert!(api.matches("/api/"));
        assert!(api.matches("/api/books"));
        assert!(api.matches("/api/books/7/bookInfo"));
        assert!(!api.matches("/apis"));
        assert!(!api.matches("/api-docs/openapi.json"));
        assert!(!api.matches("/users/register"));

        let exact = PathPattern::new("/users/register");
        assert!(exact.matches("/users/register"));
        assert!(exact.matches("/users/register/"));
        assert!(!exact.matches("/users/register/again"));

        let single = PathPattern::new("/api/books/*");
        assert!(single.matches("/api/books/1"));
        assert!(!single.matches("/api/books"));
        assert!(!single.matches("/api/books/1/info"));
    }

    #[test]
    fn test_api_rules() {
        let matrix = AuthorizationMatrix::api_rules();
        let user = principal(&[ROLE_USER]);
        let admin = principal(&[ROLE_USER, ROLE_ADMIN]);

        assert_eq!(matrix.evaluate(&Method::GET, "/api/books", Some(&user)), Ok(()));
        assert_eq!(
            matrix.evaluate(&Method::POST, "/api/books", Some(&user)),
            Err(Denial::Forbidden(AuthRejection::InsufficientRole))
        );
        assert_eq!(matrix.evaluate(&Method::POST, "/api/books", Some(&admin)), Ok(()));
        assert_eq!(matrix.evaluate(&Method::DELETE, "/api/books/1", Some(&admin)), Ok(()));
        assert_eq!(
            matrix.evaluate(&Method::GET, "/api/books", None),
            Err(Denial::Unauthorized)
        );
    }

    #[test]
    fn test_admin_without_user_role_cannot_read() {
        let matrix = AuthorizationMatrix::api_rules();
        let admin_only = principal(&[ROLE_ADMIN]);

        assert_eq!(
            matrix.evaluate(&Method::GET, "/api/books", Some(&admin_only)),
            Err(Denial::Forbidden(AuthRejection::InsufficientRole))
        );
    }

    #[test]
    fn test_unmatched_method_is_denied() {
        let matrix = AuthorizationMatrix::api_rules();
        let admin = principal(&[ROLE_USER, ROLE_ADMIN]);

        assert_eq!(
            matrix.evaluate(&Method::HEAD, "/api/books", Some(&admin)),
            Err(Denial::Forbidden(AuthRejection::InsufficientRole))
        );
        assert_eq!(
            matrix.evaluate(&Method::HEAD, "/api/books", None),
            Err(Denial::Unauthorized)
        );
    }

    #[test]
    fn test_users_rules() {
        let matrix = AuthorizationMatrix::users_rules();
        let user = principal(&[ROLE_USER]);
        let nobody = principal(&[]);

        assert_eq!(matrix.evaluate(&Method::POST, "/users/register", None), Ok(()));
        assert_eq!(
            matrix.evaluate(&Method::POST, "/users/register", Some(&user)),
            Err(Denial::Forbidden(
                AuthRejection::AlreadyAuthenticatedOnAnonymousRoute
            ))
        );

        assert_eq!(matrix.evaluate(&Method::GET, "/users/get-token", Some(&nobody)), Ok(()));
        assert_eq!(
            matrix.evaluate(&Method::POST, "/users/get-token", None),
            Err(Denial::Unauthorized)
        );

        assert_eq!(
            matrix.evaluate(&Method::GET, "/users/other", None),
            Err(Denial::Unauthorized)
        );
    }

    #[test]
    fn test_first_match_wins() {
        let matrix = AuthorizationMatrix::new(vec![
            RouteRule::new(MethodPattern::Any, "/api/public/**", Requirement::Anonymous),
            RouteRule::new(MethodPattern::Any, "/api/**", Requirement::Authenticated),
        ]);

        assert_eq!(matrix.evaluate(&Method::GET, "/api/public/x", None), Ok(()));
        assert_eq!(
            matrix.evaluate(&Method::GET, "/api/private", None),
            Err(Denial::Unauthorized)
        );
    }
}
