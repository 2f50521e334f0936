// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use validator::Validate;

use crate::{
    auth::Auth,
    error::ApiError,
    models::DataEnvelope,
    state::AppState,
    storage::{FeedPost, FeedQueryParams, PaginatedFeedQuery},
};

/// Posts by the caller and everyone the caller follows.
#[utoipa::path(
    get,
    path = "/v1/users/feed",
    params(FeedQueryParams),
    tag = "Feed",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "One page of the feed", body = DataEnvelope<Vec<FeedPost>>),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn get_user_feed(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(params): Query<FeedQueryParams>,
) -> Result<Json<DataEnvelope<Vec<FeedPost>>>, ApiError> {
    let query =
        PaginatedFeedQuery::parse(&params).map_err(|e| ApiError::bad_request(e.to_string()))?;
    query.validate()?;
    let feed = state.storage.posts().get_user_feed(user.id, query).await?;
    Ok(Json(DataEnvelope::new(feed)))
}
