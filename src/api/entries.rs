//! Loan entry endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::entry::{Entry, EntryQuery, NewEntry, PatchEntry},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/entries",
    tag = "entries",
    security(("bearer_auth" = [])),
    params(EntryQuery),
    responses(
        (status = 200, description = "List of entries", body = Vec<Entry>)
    )
)]
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
) -> Json<Vec<Entry>> {
    Json(state.services.catalog.list_entries(&query).await)
}

#[utoipa::path(
    get,
    path = "/api/entries/{id}",
    tag = "entries",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry details", body = Entry),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn get_entry(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Entry>> {
    Ok(Json(state.services.catalog.get_entry(id).await?))
}

/// Lend a book to a registered user
#[utoipa::path(
    post,
    path = "/api/entries",
    tag = "entries",
    security(("bearer_auth" = [])),
    request_body = NewEntry,
    responses(
        (status = 201, description = "Entry created", body = Entry),
        (status = 404, description = "Book or user not found")
    )
)]
pub async fn create_entry(
    State(state): State<AppState>,
    Json(new_entry): Json<NewEntry>,
) -> AppResult<(StatusCode, Json<Entry>)> {
    new_entry.validate()?;

    let entry = state.services.catalog.open_entry(new_entry).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Mark a loan as returned
#[utoipa::path(
    patch,
    path = "/api/entries/{id}",
    tag = "entries",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Entry ID")),
    request_body = PatchEntry,
    responses(
        (status = 200, description = "Entry updated", body = Entry),
        (status = 400, description = "A loan can only be set to returned"),
        (status = 404, description = "Entry not found"),
        (status = 422, description = "Book already returned")
    )
)]
pub async fn patch_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<PatchEntry>,
) -> AppResult<Json<Entry>> {
    if !patch.returned {
        return Err(AppError::BadRequest(
            "Only returning a book is supported".to_string(),
        ));
    }

    Ok(Json(state.services.catalog.return_entry(id, Utc::now()).await?))
}
