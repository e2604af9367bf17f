//! Bearer token codec.
//!
//! Tokens are compact JWS strings (`header.claims.signature`, base64url) signed
//! with HMAC-SHA512. Each token is keyed by the secret of the subject it names,
//! so replacing a subject's secret revokes every token issued before.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::secret::SigningSecret;

/// Issuer written into and expected from every token
pub const TOKEN_ISSUER: &str = "library-app";

/// Scheme prefix accepted in front of a token
pub const BEARER_PREFIX: &str = "Bearer ";

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Claim set carried by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub subject: String,
    pub iss: String,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// The token could not be parsed at all
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected 3 token segments, found {0}")]
    SegmentCount(usize),

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// The token parsed but is not acceptable for the expected subject
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("issuer mismatch")]
    IssuerMismatch,

    #[error("subject mismatch")]
    SubjectMismatch,

    #[error("token expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Remove a leading `Bearer ` if present
pub fn strip_bearer_prefix(raw: &str) -> &str {
    raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw)
}

/// Issues, decodes and verifies subject-keyed tokens
#[derive(Debug, Clone)]
pub struct TokenCodec {
    issuer: String,
    ttl: Duration,
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new(TOKEN_ISSUER, Duration::days(1))
    }
}

impl TokenCodec {
    pub fn new(issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            issuer: issuer.into(),
            ttl,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign a fresh claim set for `subject_id`, valid until `now + ttl`
    pub fn issue(
        &self,
        subject_id: &str,
        secret: &SigningSecret,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = TokenClaims {
            subject: subject_id.to_string(),
            iss: self.issuer.clone(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Read the claims without checking the signature.
    ///
    /// Only used to find out whose secret the token must be verified against.
    pub fn decode_claims(token: &str) -> Result<TokenClaims, DecodeError> {
        let token = strip_bearer_prefix(token);

        let segments = token.split('.').count();
        if segments != 3 {
            return Err(DecodeError::SegmentCount(segments));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }

    /// Check signature, issuer, subject and expiry.
    ///
    /// A token is expired once `now >= exp`; no leeway is applied.
    pub fn verify(
        token: &str,
        secret: &SigningSecret,
        expected_issuer: &str,
        expected_subject: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, VerificationError> {
        let token = strip_bearer_prefix(token);

        let mut validation = Validation::new(ALGORITHM);
        // expiry is checked below against the caller's clock
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[expected_issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let claims = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => VerificationError::SignatureMismatch,
            ErrorKind::InvalidIssuer => VerificationError::IssuerMismatch,
            _ => VerificationError::Malformed(e.to_string()),
        })?;

        if claims.subject != expected_subject {
            return Err(VerificationError::SubjectMismatch);
        }

        if now.timestamp() >= claims.exp {
            return Err(VerificationError::Expired);
        }

        Ok(claims)
    }
}
