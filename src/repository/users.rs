//! Users repository for database operations

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::UserRepository;
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUserRecord, User},
    security::SigningSecret,
};

#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, secret, created_at
            FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, record: NewUserRecord) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, secret)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            RETURNING id, username, password_hash, secret, created_at
            "#,
        )
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(record.secret.as_bytes())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("Username '{}' is already taken", record.username))
        })?;

        sqlx::query(
            r#"
            INSERT INTO user_authorities (user_id, authority_id)
            SELECT $1, id FROM authorities WHERE name = ANY($2)
            "#,
        )
        .bind(user.id)
        .bind(&record.roles)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn secret_of(&self, username: &str) -> AppResult<Option<SigningSecret>> {
        let secret: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT secret FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(secret.map(SigningSecret::from_bytes))
    }

    async fn rotate_secret(&self, username: &str, secret: SigningSecret) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET secret = $1 WHERE username = $2")
            .bind(secret.as_bytes())
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn roles_of(&self, username: &str) -> AppResult<BTreeSet<String>> {
        let roles: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT a.name
            FROM authorities a
            JOIN user_authorities ua ON ua.authority_id = a.id
            JOIN users u ON u.id = ua.user_id
            WHERE u.username = $1
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles.into_iter().collect())
    }

    async fn ensure_authority(&self, name: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO authorities (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn grant(&self, username: &str, authority: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_authorities (user_id, authority_id)
            SELECT u.id, a.id FROM users u, authorities a
            WHERE u.username = $1 AND a.name = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(username)
        .bind(authority)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(username, authority, "Authority already granted or missing");
        }
        Ok(())
    }
}
