//! Registration and token endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use super::AuthenticatedUser;
use crate::{
    error::AppResult,
    models::user::{CurrentUser, NewUser, RegistrationResponse, TokenResponse},
    AppState,
};

/// Register a new user
#[utoipa::path(
    post,
    path = "/users/register",
    tag = "users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User registered", body = RegistrationResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Caller is already authenticated"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
    new_user.validate()?;

    state.services.users.register(new_user).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse { is_registered: true }),
    ))
}

/// Exchange username and password for a bearer token
#[utoipa::path(
    post,
    path = "/users/get-token",
    tag = "users",
    security(("basic_auth" = [])),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn get_token(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> AppResult<Json<TokenResponse>> {
    let token = state.services.users.issue_token(&principal.subject_id).await?;
    tracing::debug!(subject = %principal.subject_id, "Token issued");
    Ok(Json(TokenResponse { token }))
}

/// Replace the caller's signing secret, revoking every token issued so far
#[utoipa::path(
    post,
    path = "/users/rotate-secret",
    tag = "users",
    security(("basic_auth" = [])),
    responses(
        (status = 204, description = "Secret replaced"),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn rotate_secret(
    State(state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> AppResult<StatusCode> {
    state.services.users.rotate_secret(&principal.subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current user
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = CurrentUser),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(AuthenticatedUser(principal): AuthenticatedUser) -> Json<CurrentUser> {
    Json(principal.into())
}
