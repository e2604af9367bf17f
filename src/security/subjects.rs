//! Lookups the security layer needs from the user store

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::secret::SigningSecret;
use crate::error::AppResult;

/// Finds the signing secret of a subject
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, subject_id: &str) -> AppResult<Option<SigningSecret>>;
}

/// Finds the roles granted to a subject
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn get_roles(&self, subject_id: &str) -> AppResult<BTreeSet<String>>;
}

/// Checks a username/password pair against the stored hash
#[async_trait]
pub trait PasswordVerifier: Send + Sync {
    async fn verify_password(&self, username: &str, plaintext: &str) -> AppResult<bool>;
}
