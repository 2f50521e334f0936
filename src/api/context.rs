// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request context for routes under `/v1/posts/{post_id}`.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};

use super::PathParam;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{Post, User};

/// The authenticated caller plus the post named in the path.
///
/// Authentication runs first, so an anonymous request for a missing post
/// is a 401, not a 404.
pub struct PostContext {
    pub user: User,
    pub post: Post,
}

impl FromRequestParts<AppState> for PostContext {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let PathParam(post_id) = PathParam::<i64>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let post = state
            .storage
            .posts()
            .get_by_id(post_id)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;

        Ok(PostContext { user, post })
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{seed_user, send, test_app};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn missing_post_is_not_found_after_auth() {
        let (state, app, _dir) = test_app();
        let (_, token) = seed_user(&state, "alice").await;

        let (status, _) = send(&app, Method::GET, "/v1/posts/42", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, Method::GET, "/v1/posts/42", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "the requested resource could not be found");
    }

    #[tokio::test]
    async fn non_numeric_post_id_is_bad_request() {
        let (state, app, _dir) = test_app();
        let (_, token) = seed_user(&state, "alice").await;

        let (status, _) = send(&app, Method::GET, "/v1/posts/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
