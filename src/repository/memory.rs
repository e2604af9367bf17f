//! In-memory user store, used by tests and when no database is configured

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::UserRepository;
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUserRecord, User},
    security::SigningSecret,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: HashMap<String, User>,
    roles: HashMap<String, BTreeSet<String>>,
    authorities: BTreeSet<String>,
}

#[derive(Default)]
pub struct MemoryUserRepository {
    inner: RwLock<Inner>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(username).cloned())
    }

    async fn create_user(&self, record: NewUserRecord) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&record.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                record.username
            )));
        }

        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            username: record.username.clone(),
            password_hash: record.password_hash,
            secret: record.secret.into_bytes(),
            created_at: Utc::now(),
        };

        // only authorities that exist are granted
        let roles: BTreeSet<String> = record
            .roles
            .into_iter()
            .filter(|role| inner.authorities.contains(role))
            .collect();

        inner.roles.insert(record.username.clone(), roles);
        inner.users.insert(record.username, user.clone());
        Ok(user)
    }

    async fn secret_of(&self, username: &str) -> AppResult<Option<SigningSecret>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(username).map(User::signing_secret))
    }

    async fn rotate_secret(&self, username: &str, secret: SigningSecret) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(username) {
            Some(user) => {
                user.secret = secret.into_bytes();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn roles_of(&self, username: &str) -> AppResult<BTreeSet<String>> {
        let inner = self.inner.read().await;
        Ok(inner.roles.get(username).cloned().unwrap_or_default())
    }

    async fn ensure_authority(&self, name: &str) -> AppResult<()> {
        self.inner.write().await.authorities.insert(name.to_string());
        Ok(())
    }

    async fn grant(&self, username: &str, authority: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.authorities.contains(authority) {
            return Ok(());
        }
        if let Some(roles) = inner.roles.get_mut(username) {
            roles.insert(authority.to_string());
        }
        Ok(())
    }
}
