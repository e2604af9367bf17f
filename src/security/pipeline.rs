//! Authentication pipelines.
//!
//! A pipeline looks at the request headers and either produces an identity
//! or explains why there is none. It never refuses the request itself; the
//! authorization matrix makes that call afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{
    credentials::{AuthOutcome, AuthRejection, CredentialVerifier},
    principal::Principal,
    subjects::{PasswordVerifier, RoleResolver},
};
use crate::error::AppResult;

const BASIC_PREFIX: &str = "Basic ";

#[async_trait]
pub trait AuthenticationPipeline: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthOutcome>;
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Bearer token authentication for the API surface
pub struct TokenPipeline {
    verifier: CredentialVerifier,
}

impl TokenPipeline {
    pub fn new(verifier: CredentialVerifier) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl AuthenticationPipeline for TokenPipeline {
    fn name(&self) -> &'static str {
        "token"
    }

    async fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthOutcome> {
        let raw = match headers.get(header::AUTHORIZATION) {
            Some(value) => match value.to_str() {
                Ok(raw) => Some(raw),
                // non-ASCII header bytes can't be a token
                Err(_) => return Ok(AuthOutcome::Rejected(AuthRejection::MalformedToken)),
            },
            None => None,
        };

        self.verifier.authenticate(raw).await
    }
}

/// Username/password authentication for registration and token issuance
pub struct PasswordPipeline {
    passwords: Arc<dyn PasswordVerifier>,
    roles: Arc<dyn RoleResolver>,
}

impl PasswordPipeline {
    pub fn new(passwords: Arc<dyn PasswordVerifier>, roles: Arc<dyn RoleResolver>) -> Self {
        Self { passwords, roles }
    }
}

#[async_trait]
impl AuthenticationPipeline for PasswordPipeline {
    fn name(&self) -> &'static str {
        "password"
    }

    async fn authenticate(&self, headers: &HeaderMap) -> AppResult<AuthOutcome> {
        let Some(raw) = authorization_header(headers) else {
            return Ok(AuthOutcome::Rejected(AuthRejection::MissingCredential));
        };

        let Some((username, password)) = parse_basic_credentials(raw) else {
            return Ok(AuthOutcome::Rejected(AuthRejection::BadCredentials));
        };

        if !self.passwords.verify_password(&username, &password).await? {
            tracing::debug!(subject = %username, "Password check failed");
            return Ok(AuthOutcome::Rejected(AuthRejection::BadCredentials));
        }

        let roles = self.roles.get_roles(&username).await?;
        Ok(AuthOutcome::Authenticated(Principal::new(username, roles)))
    }
}

/// Parse `Basic base64(username:password)`
pub fn parse_basic_credentials(raw: &str) -> Option<(String, String)> {
    let encoded = raw.trim().strip_prefix(BASIC_PREFIX)?;
    let decoded = STANDARD.decode(encoded.trim().as_bytes()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let (username, password) = decoded.split_once(':')?;
    if username.is_empty() {
        return None;
    }

    Some((username.to_string(), password.to_string()))
}
