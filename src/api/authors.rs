//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use super::AuthenticatedUser;
use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorInput, AuthorQuery},
        book::DeleteResponse,
    },
    AppState,
};

/// List authors, optionally filtered by name
#[utoipa::path(
    get,
    path = "/api/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(AuthorQuery),
    responses(
        (status = 200, description = "List of authors", body = Vec<Author>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<AuthorQuery>,
) -> Json<Vec<Author>> {
    Json(state.services.catalog.list_authors(&query).await)
}

#[utoipa::path(
    get,
    path = "/api/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Author>> {
    Ok(Json(state.services.catalog.get_author(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(input): Json<AuthorInput>,
) -> AppResult<(StatusCode, Json<Author>)> {
    input.validate()?;

    let author = state.services.catalog.create_author(input).await;
    tracing::info!(id = author.id, by = %principal.subject_id, "Author created");
    Ok((StatusCode::CREATED, Json(author)))
}

#[utoipa::path(
    put,
    path = "/api/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AuthorInput>,
) -> AppResult<Json<Author>> {
    input.validate()?;

    Ok(Json(state.services.catalog.update_author(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Whether a author was deleted", body = DeleteResponse)
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<DeleteResponse> {
    let deleted = state.services.catalog.delete_author(id).await;
    Json(DeleteResponse { deleted })
}
