//! Repository layer for subject storage

pub mod memory;
pub mod users;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::user::{NewUserRecord, User},
    security::SigningSecret,
};

pub use memory::MemoryUserRepository;
pub use users::PgUserRepository;

/// Storage for users, their signing secrets and their authorities
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Insert a user with its authorities; `AppError::Conflict` if the name is taken
    async fn create_user(&self, record: NewUserRecord) -> AppResult<User>;

    async fn secret_of(&self, username: &str) -> AppResult<Option<SigningSecret>>;

    /// Replace the user's secret, invalidating every token signed with the old one.
    /// Returns false when the user does not exist.
    async fn rotate_secret(&self, username: &str, secret: SigningSecret) -> AppResult<bool>;

    /// Authority names held by the user; empty for unknown users
    async fn roles_of(&self, username: &str) -> AppResult<BTreeSet<String>>;

    /// Create the authority if missing. Safe to call repeatedly.
    async fn ensure_authority(&self, name: &str) -> AppResult<()>;

    /// Grant an existing authority to an existing user
    async fn grant(&self, username: &str, authority: &str) -> AppResult<()>;
}
