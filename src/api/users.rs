// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use super::PathParam;
use crate::{
    auth::Auth,
    error::ApiError,
    models::DataEnvelope,
    state::AppState,
    storage::User,
};

#[utoipa::path(
    get,
    path = "/v1/users/{user_id}",
    params(("user_id" = i64, Path, description = "User identifier")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = DataEnvelope<User>),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such user"),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(_caller): Auth,
    PathParam(user_id): PathParam<i64>,
) -> Result<Json<DataEnvelope<User>>, ApiError> {
    let user = state.storage.users().get_by_id(user_id).await?;
    Ok(Json(DataEnvelope::new(user)))
}

/// Make the caller follow `user_id`.
#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/follow",
    params(("user_id" = i64, Path, description = "User to follow")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Now following"),
        (status = 400, description = "Cannot follow yourself"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Already following"),
    )
)]
pub async fn follow_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    PathParam(user_id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    if user_id == caller.id {
        return Err(ApiError::bad_request("cannot follow yourself"));
    }

    state.storage.followers().follow(user_id, caller.id).await?;
    info!(user_id = caller.id, followed_id = user_id, "User followed");
    Ok(StatusCode::NO_CONTENT)
}

/// Stop following `user_id`. Unfollowing someone not followed is a no-op.
#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/unfollow",
    params(("user_id" = i64, Path, description = "User to unfollow")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "No longer following"),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn unfollow_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    PathParam(user_id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    state.storage.followers().unfollow(user_id, caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Activate the account behind a plain invitation token.
#[utoipa::path(
    put,
    path = "/v1/users/activate/{token}",
    params(("token" = String, Path, description = "Plain activation token from the welcome email")),
    tag = "Users",
    responses(
        (status = 204, description = "Account activated"),
        (status = 404, description = "Unknown or expired token"),
    )
)]
pub async fn activate_user(
    State(state): State<AppState>,
    PathParam(token): PathParam<String>,
) -> Result<StatusCode, ApiError> {
    state.storage.users().activate(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
