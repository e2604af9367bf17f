//! Business logic services

pub mod catalog;
pub mod users;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::UserRepository, security::TokenCodec};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub codec: Arc<TokenCodec>,
}

impl Services {
    /// Create all services on top of the given user store
    pub fn new(repository: Arc<dyn UserRepository>, auth_config: &AuthConfig) -> Self {
        let codec = Arc::new(TokenCodec::new(
            auth_config.issuer.clone(),
            chrono::Duration::hours(auth_config.token_ttl_hours),
        ));

        Self {
            users: users::UsersService::new(repository.clone(), codec.clone()),
            catalog: catalog::CatalogService::new(repository),
            codec,
        }
    }
}
