//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::AuthenticatedUser;
use crate::{
    error::AppResult,
    models::book::{Book, BookInfo, BookQuery, DeleteResponse, NewBook, PatchBook, PatchBookInfo},
    AppState,
};

/// List books, filtered by title, author name or genre name
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "User role required")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Json<Vec<Book>> {
    Json(state.services.catalog.list_books(&query).await)
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Book>> {
    Ok(Json(state.services.catalog.get_book(id).await?))
}

/// Create a book from existing authors and genres
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "Unknown author or genre")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(new_book): Json<NewBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    new_book.validate()?;

    let book = state.services.catalog.create_book(new_book).await?;
    tracing::info!(id = book.id, by = %principal.subject_id, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    patch,
    path = "/api/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = PatchBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book, author or genre not found")
    )
)]
pub async fn patch_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<PatchBook>,
) -> AppResult<Json<Book>> {
    patch.validate()?;

    Ok(Json(state.services.catalog.patch_book(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Whether a book was deleted", body = DeleteResponse)
    )
)]
pub async fn delete_book(State(state): State<AppState>, Path(id): Path<i64>) -> Json<DeleteResponse> {
    let deleted = state.services.catalog.delete_book(id).await;
    Json(DeleteResponse { deleted })
}

/// Descriptive details of a book
#[utoipa::path(
    get,
    path = "/api/books/{id}/bookInfo",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookInfo),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_info(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BookInfo>> {
    Ok(Json(state.services.catalog.get_book_info(id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/books/{id}/bookInfo",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = PatchBookInfo,
    responses(
        (status = 200, description = "Book details updated", body = BookInfo),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn patch_book_info(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<PatchBookInfo>,
) -> AppResult<Json<BookInfo>> {
    patch.validate()?;

    Ok(Json(state.services.catalog.patch_book_info(id, patch).await?))
}
