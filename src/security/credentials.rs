//! Bearer credential verification

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    principal::Principal,
    subjects::{RoleResolver, SecretStore},
    token::{strip_bearer_prefix, TokenCodec},
};
use crate::error::AppResult;

/// Why a request ended up without an identity, or was refused one.
///
/// Internal diagnostics only; clients see nothing but 401 or 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingCredential,
    MalformedToken,
    UnknownSubject,
    InvalidOrExpiredToken,
    BadCredentials,
    InsufficientRole,
    AlreadyAuthenticatedOnAnonymousRoute,
}

impl AuthRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthRejection::MissingCredential => "missing-credential",
            AuthRejection::MalformedToken => "malformed-token",
            AuthRejection::UnknownSubject => "unknown-subject",
            AuthRejection::InvalidOrExpiredToken => "invalid-or-expired",
            AuthRejection::BadCredentials => "bad-credentials",
            AuthRejection::InsufficientRole => "insufficient-role",
            AuthRejection::AlreadyAuthenticatedOnAnonymousRoute => "already-authenticated",
        }
    }
}

impl std::fmt::Display for AuthRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of authenticating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Rejected(AuthRejection),
}

/// Turns an `Authorization` header value into an identity
#[derive(Clone)]
pub struct CredentialVerifier {
    codec: Arc<TokenCodec>,
    secrets: Arc<dyn SecretStore>,
    roles: Arc<dyn RoleResolver>,
}

impl CredentialVerifier {
    pub fn new(
        codec: Arc<TokenCodec>,
        secrets: Arc<dyn SecretStore>,
        roles: Arc<dyn RoleResolver>,
    ) -> Self {
        Self {
            codec,
            secrets,
            roles,
        }
    }

    pub async fn authenticate(&self, raw_header: Option<&str>) -> AppResult<AuthOutcome> {
        self.authenticate_at(raw_header, Utc::now()).await
    }

    /// Authenticate against an explicit clock.
    ///
    /// The subject read from the unverified claims only selects the secret;
    /// it is trusted once the signature over it checks out.
    pub async fn authenticate_at(
        &self,
        raw_header: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<AuthOutcome> {
        // the codec strips the scheme; the value is handed over with it
        let token = match raw_header.map(str::trim_start) {
            Some(token) if !strip_bearer_prefix(token).trim().is_empty() => token.trim_end(),
            _ => return Ok(AuthOutcome::Rejected(AuthRejection::MissingCredential)),
        };

        let claims = match TokenCodec::decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Token could not be decoded");
                return Ok(AuthOutcome::Rejected(AuthRejection::MalformedToken));
            }
        };
        let subject_id = claims.subject;

        let secret = match self.secrets.get_secret(&subject_id).await? {
            Some(secret) => secret,
            None => {
                tracing::debug!(subject = %subject_id, "No secret for token subject");
                return Ok(AuthOutcome::Rejected(AuthRejection::UnknownSubject));
            }
        };

        if let Err(e) =
            TokenCodec::verify(token, &secret, self.codec.issuer(), &subject_id, now)
        {
            tracing::debug!(subject = %subject_id, error = %e, "Token verification failed");
            return Ok(AuthOutcome::Rejected(AuthRejection::InvalidOrExpiredToken));
        }

        let roles = self.roles.get_roles(&subject_id).await?;

        Ok(AuthOutcome::Authenticated(Principal::new(subject_id, roles)))
    }
}
