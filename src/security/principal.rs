//! Identity attached to a request once authentication succeeds

use std::collections::BTreeSet;

pub const ROLE_USER: &str = "USER";
pub const ROLE_ADMIN: &str = "ADMIN";

/// Authenticated subject and its roles.
///
/// Lives in the request extensions for the duration of one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: String,
    pub roles: BTreeSet<String>,
}

impl Principal {
    pub fn new(subject_id: impl Into<String>, roles: BTreeSet<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
