//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, entries, genres, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library catalog REST API",
        license(name = "MIT")
    ),
    paths(
        // Health
        health::health_check,
        // Users
        users::register,
        users::get_token,
        users::rotate_secret,
        users::me,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Genres
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::update_genre,
        genres::delete_genre,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::patch_book,
        books::delete_book,
        books::get_book_info,
        books::patch_book_info,
        // Entries
        entries::list_entries,
        entries::get_entry,
        entries::create_entry,
        entries::patch_entry,
    ),
    components(
        schemas(
            // Users
            crate::models::user::NewUser,
            crate::models::user::RegistrationResponse,
            crate::models::user::TokenResponse,
            crate::models::user::CurrentUser,
            // Catalog
            crate::models::author::Author,
            crate::models::author::AuthorInput,
            crate::models::genre::Genre,
            crate::models::genre::GenreInput,
            crate::models::book::Book,
            crate::models::book::NewBook,
            crate::models::book::PatchBook,
            crate::models::book::BookInfo,
            crate::models::book::PatchBookInfo,
            crate::models::book::DeleteResponse,
            crate::models::entry::Entry,
            crate::models::entry::NewEntry,
            crate::models::entry::PatchEntry,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration and tokens"),
        (name = "authors", description = "Author management"),
        (name = "genres", description = "Genre management"),
        (name = "books", description = "Book management"),
        (name = "entries", description = "Loan management")
    )
)]
pub struct ApiDoc;

/// Registers the two authentication schemes used by the security chains
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
