//! API handlers and router

pub mod authors;
pub mod books;
pub mod entries;
pub mod genres;
pub mod health;
pub mod openapi;
pub mod users;

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    error::AppError,
    security::{
        cors, ChainDispatcher, CredentialVerifier, PasswordPipeline, Principal, SecurityLayer,
        TokenPipeline,
    },
    AppState,
};

/// Extractor for the identity the security layer attached to the request
pub struct AuthenticatedUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))
    }
}

/// Build the security chains over the users service
pub fn dispatcher(state: &AppState) -> ChainDispatcher {
    let users = Arc::new(state.services.users.clone());
    let verifier = CredentialVerifier::new(state.services.codec.clone(), users.clone(), users.clone());

    ChainDispatcher::standard(
        Arc::new(TokenPipeline::new(verifier)),
        Arc::new(PasswordPipeline::new(users.clone(), users)),
    )
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let dispatcher = Arc::new(dispatcher(&state));
    let cors = cors::layer(dispatcher.clone(), &state.config.cors);

    let api = Router::new()
        .route("/me", get(users::me))
        // Authors
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        // Genres
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/:id",
            get(genres::get_genre)
                .put(genres::update_genre)
                .delete(genres::delete_genre),
        )
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .patch(books::patch_book)
                .delete(books::delete_book),
        )
        .route(
            "/books/:id/bookInfo",
            get(books::get_book_info).patch(books::patch_book_info),
        )
        // Entries
        .route("/entries", get(entries::list_entries).post(entries::create_entry))
        .route("/entries/:id", get(entries::get_entry).patch(entries::patch_entry));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/users/register", post(users::register))
        .route("/users/get-token", get(users::get_token).post(users::get_token))
        .route("/users/rotate-secret", post(users::rotate_secret))
        .nest("/api", api)
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(SecurityLayer::new(dispatcher))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
