//! Library catalog server
//!
//! REST JSON API for authors, genres, books and loans, protected by two
//! stateless security chains: per-user signed bearer tokens on `/api/**`
//! and username/password on `/users/**`.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod security;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::UserRepository;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(config: AppConfig, repository: Arc<dyn UserRepository>) -> Self {
        let services = services::Services::new(repository, &config.auth);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
