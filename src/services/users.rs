//! Registration, password checks and token issuance

use std::collections::BTreeSet;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier as _, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;

use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, NewUserRecord, User},
    repository::UserRepository,
    security::{
        PasswordVerifier, RoleResolver, SecretStore, SigningSecret, TokenCodec, ROLE_ADMIN,
        ROLE_USER,
    },
};

/// Hash checked when the username is unknown, so a miss costs one argon2 run like a hit
static UNKNOWN_USER_HASH: OnceCell<String> = OnceCell::new();

#[derive(Clone)]
pub struct UsersService {
    repository: Arc<dyn UserRepository>,
    codec: Arc<TokenCodec>,
}

impl UsersService {
    pub fn new(repository: Arc<dyn UserRepository>, codec: Arc<TokenCodec>) -> Self {
        Self { repository, codec }
    }

    /// Create the default authorities, and the administrator when credentials are given.
    /// Idempotent: safe on every startup.
    pub async fn bootstrap(&self, admin: Option<(&str, &str)>) -> AppResult<()> {
        self.repository.ensure_authority(ROLE_USER).await?;
        self.repository.ensure_authority(ROLE_ADMIN).await?;

        let Some((username, password)) = admin else {
            return Ok(());
        };

        if self.repository.find_by_username(username).await?.is_some() {
            self.repository.grant(username, ROLE_USER).await?;
            self.repository.grant(username, ROLE_ADMIN).await?;
            tracing::debug!(username, "Administrator already present");
            return Ok(());
        }

        self.repository
            .create_user(NewUserRecord {
                username: username.to_string(),
                password_hash: hash_password(password).await?,
                secret: SigningSecret::generate(),
                roles: vec![ROLE_USER.to_string(), ROLE_ADMIN.to_string()],
            })
            .await?;
        tracing::info!(username, "Administrator created");
        Ok(())
    }

    /// Register a new user with role USER and a fresh signing secret.
    /// The request must already be validated.
    pub async fn register(&self, new_user: NewUser) -> AppResult<User> {
        let user = self
            .repository
            .create_user(NewUserRecord {
                password_hash: hash_password(&new_user.password).await?,
                username: new_user.username,
                secret: SigningSecret::generate(),
                roles: vec![ROLE_USER.to_string()],
            })
            .await?;

        tracing::info!(username = %user.username, "User registered");
        Ok(user)
    }

    pub async fn issue_token(&self, username: &str) -> AppResult<String> {
        self.issue_token_at(username, Utc::now()).await
    }

    /// Sign a token for `username` with that user's own secret
    pub async fn issue_token_at(&self, username: &str, now: DateTime<Utc>) -> AppResult<String> {
        let secret = self
            .repository
            .secret_of(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))?;

        self.codec
            .issue(username, &secret, now)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Replace the user's secret; every token issued before stops verifying
    pub async fn rotate_secret(&self, username: &str) -> AppResult<()> {
        if !self
            .repository
            .rotate_secret(username, SigningSecret::generate())
            .await?
        {
            return Err(AppError::NotFound(format!("User '{}' not found", username)));
        }
        tracing::info!(username, "Signing secret rotated");
        Ok(())
    }
}

/// Hash a password using Argon2, off the async workers
async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// Check a password against a stored hash, or against the unknown-user hash when `None`
async fn check_password(stored: Option<String>, password: &str) -> AppResult<bool> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || check_blocking(stored.as_deref(), &password))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
}

fn hash_blocking(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn check_blocking(stored: Option<&str>, password: &str) -> AppResult<bool> {
    let hash = match stored {
        Some(hash) => hash,
        None => UNKNOWN_USER_HASH
            .get_or_try_init(|| hash_blocking("unknown-user"))?
            .as_str(),
    };
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    let matches = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();
    Ok(stored.is_some() && matches)
}

#[async_trait]
impl SecretStore for UsersService {
    async fn get_secret(&self, subject_id: &str) -> AppResult<Option<SigningSecret>> {
        self.repository.secret_of(subject_id).await
    }
}

#[async_trait]
impl RoleResolver for UsersService {
    async fn get_roles(&self, subject_id: &str) -> AppResult<BTreeSet<String>> {
        self.repository.roles_of(subject_id).await
    }
}

#[async_trait]
impl PasswordVerifier for UsersService {
    async fn verify_password(&self, username: &str, plaintext: &str) -> AppResult<bool> {
        let user = self.repository.find_by_username(username).await?;
        check_password(user.map(|u| u.password_hash), plaintext).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryUserRepository;
    use crate::security::token::TOKEN_ISSUER;

    async fn service() -> UsersService {
        let service = UsersService::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(TokenCodec::default()),
        );
        service.bootstrap(Some(("admin", "admin-password"))).await.unwrap();
        service
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: "secret1".to_string(),
            password2: "secret1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register() {
        let service = service().await;

        let user = service.register(new_user("alice")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.secret.len(), crate::security::secret::SECRET_LEN);
        assert_ne!(user.password_hash, "secret1");

        assert_eq!(
            service.get_roles("alice").await.unwrap(),
            BTreeSet::from([ROLE_USER.to_string()])
        );

        let err = service.register(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let service = service().await;
        service.bootstrap(Some(("admin", "other"))).await.unwrap();

        let roles = service.get_roles("admin").await.unwrap();
        assert!(roles.contains(ROLE_USER));
        assert!(roles.contains(ROLE_ADMIN));
        assert!(service.verify_password("admin", "admin-password").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_password() {
        let service = service().await;
        service.register(new_user("alice")).await.unwrap();

        assert!(service.verify_password("alice", "secret1").await.unwrap());
        assert!(!service.verify_password("alice", "wrong").await.unwrap());
        assert!(!service.verify_password("nobody", "secret1").await.unwrap());
    }

    #[test]
    fn test_unknown_user_runs_the_hasher() {
        assert!(!check_blocking(None, "unknown-user").unwrap());

        // the stand-in hash has the cost of a real one
        let stand_in = PasswordHash::new(UNKNOWN_USER_HASH.get().unwrap()).unwrap();
        let real_hash = hash_blocking("secret1").unwrap();
        let real = PasswordHash::new(&real_hash).unwrap();
        assert_eq!(stand_in.algorithm, real.algorithm);
        assert_eq!(stand_in.params, real.params);

        assert!(check_blocking(Some(real_hash.as_str()), "secret1").unwrap());
        assert!(!check_blocking(Some(real_hash.as_str()), "unknown-user").unwrap());
    }

    #[tokio::test]
    async fn test_issue_token_uses_own_secret() {
        let service = service().await;
        service.register(new_user("alice")).await.unwrap();

        let now = Utc::now();
        let token = service.issue_token_at("alice", now).await.unwrap();
        let secret = service.get_secret("alice").await.unwrap().unwrap();
        let claims = TokenCodec::verify(&token, &secret, TOKEN_ISSUER, "alice", now).unwrap();
        assert_eq!(claims.subject, "alice");

        service.rotate_secret("alice").await.unwrap();
        let rotated = service.get_secret("alice").await.unwrap().unwrap();
        assert!(TokenCodec::verify(&token, &rotated, TOKEN_ISSUER, "alice", now).is_err());

        let err = service.issue_token("nobody").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
