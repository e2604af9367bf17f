//! User (subject) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::security::{Principal, SigningSecret};

/// User row from the database.
///
/// Not serializable: the hash and the secret never leave the server.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub secret: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn signing_secret(&self) -> SigningSecret {
        SigningSecret::from_bytes(self.secret.clone())
    }
}

/// Everything needed to insert a new user
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: String,
    pub secret: SigningSecret,
    pub roles: Vec<String>,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewUser {
    #[validate(
        length(min = 3, max = 50, message = "Username must be 3 to 50 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Repeated password
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password2: String,
}

/// Basic credentials split at the first ':', so a username cannot carry one
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().any(|c| c == ':' || c.is_control()) {
        let mut error = ValidationError::new("username_charset");
        error.message = Some("Username must not contain ':' or control characters".into());
        return Err(error);
    }
    Ok(())
}

/// Registration result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    #[serde(rename = "isRegistered")]
    pub is_registered: bool,
}

/// Issued bearer token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// The caller as seen by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub username: String,
    pub roles: Vec<String>,
}

impl From<Principal> for CurrentUser {
    fn from(principal: Principal) -> Self {
        Self {
            username: principal.subject_id,
            roles: principal.roles.into_iter().collect(),
        }
    }
}
