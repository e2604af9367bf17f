//! Genre endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::DeleteResponse,
        genre::{Genre, GenreInput},
    },
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/genres",
    tag = "genres",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<AppState>) -> Json<Vec<Genre>> {
    Json(state.services.catalog.list_genres().await)
}

#[utoipa::path(
    get,
    path = "/api/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "Genre details", body = Genre),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn get_genre(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Genre>> {
    Ok(Json(state.services.catalog.get_genre(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/genres",
    tag = "genres",
    security(("bearer_auth" = [])),
    request_body = GenreInput,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 409, description = "Genre already exists")
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    Json(input): Json<GenreInput>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    input.validate()?;

    let genre = state.services.catalog.create_genre(input).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

#[utoipa::path(
    put,
    path = "/api/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Genre ID")),
    request_body = GenreInput,
    responses(
        (status = 200, description = "Genre updated", body = Genre),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn update_genre(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<GenreInput>,
) -> AppResult<Json<Genre>> {
    input.validate()?;

    Ok(Json(state.services.catalog.update_genre(id, input).await?))
}

#[utoipa::path(
    delete,
    path = "/api/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "Whether a genre was deleted", body = DeleteResponse)
    )
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<DeleteResponse> {
    let deleted = state.services.catalog.delete_genre(id).await;
    Json(DeleteResponse { deleted })
}
