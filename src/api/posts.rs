// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post and comment endpoints.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;
use validator::Validate;

use super::{context::PostContext, JsonBody};
use crate::{
    auth::{
        roles::{ADMIN_ROLE, MODERATOR_ROLE},
        Auth,
    },
    error::ApiError,
    models::{
        CreateCommentPayload, CreatePostPayload, DataEnvelope, DeletePostResponse,
        UpdatePostPayload,
    },
    state::AppState,
    storage::{Comment, NewComment, NewPost, Post, User},
};

/// Run the authorization gate on `post`; a denial is a 403.
async fn require_role(
    state: &AppState,
    user: &User,
    post: &Post,
    required_role: &str,
) -> Result<(), ApiError> {
    let allowed = state
        .gate
        .authorize_resource(user, post, required_role)
        .await
        .map_err(ApiError::internal)?;
    if !allowed {
        return Err(ApiError::forbidden());
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/posts",
    request_body = CreatePostPayload,
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Post created", body = DataEnvelope<Post>),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid token"),
    )
)]
pub async fn create_post(
    State(state): State<AppState>,
    Auth(user): Auth,
    JsonBody(payload): JsonBody<CreatePostPayload>,
) -> Result<(StatusCode, Json<DataEnvelope<Post>>), ApiError> {
    payload.validate()?;

    let post = state
        .storage
        .posts()
        .create(NewPost {
            title: payload.title,
            content: payload.content,
            user_id: user.id,
            tags: payload.tags,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataEnvelope::new(post))))
}

#[utoipa::path(
    get,
    path = "/v1/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post identifier")),
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Post with its comments, newest first", body = DataEnvelope<Post>),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    ctx: PostContext,
) -> Result<Json<DataEnvelope<Post>>, ApiError> {
    let mut post = ctx.post;
    post.comments = state.storage.comments().get_by_post_id(post.id).await?;
    Ok(Json(DataEnvelope::new(post)))
}

/// Update title and/or content under optimistic concurrency.
///
/// The owner may always update; anyone else needs at least `moderator`.
/// When the body has no `version`, the version loaded with the post is used.
#[utoipa::path(
    patch,
    path = "/v1/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post identifier")),
    request_body = UpdatePostPayload,
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated post", body = DataEnvelope<Post>),
        (status = 403, description = "Caller is neither owner nor moderator"),
        (status = 404, description = "No such post, or the version has moved on"),
    )
)]
pub async fn update_post(
    State(state): State<AppState>,
    ctx: PostContext,
    JsonBody(payload): JsonBody<UpdatePostPayload>,
) -> Result<Json<DataEnvelope<Post>>, ApiError> {
    require_role(&state, &ctx.user, &ctx.post, MODERATOR_ROLE).await?;
    payload.validate()?;

    let expected_version = payload.version.unwrap_or(ctx.post.version);
    let UpdatePostPayload { title, content, .. } = payload;

    let post = state
        .storage
        .posts()
        .update(ctx.post.id, expected_version, move |post| {
            if let Some(title) = title {
                post.title = title;
            }
            if let Some(content) = content {
                post.content = content;
            }
        })
        .await?;

    info!(post_id = post.id, version = post.version, user_id = ctx.user.id, "Post updated");
    Ok(Json(DataEnvelope::new(post)))
}

/// Delete a post and its comments. Owner or `admin` only.
#[utoipa::path(
    delete,
    path = "/v1/posts/{post_id}",
    params(("post_id" = i64, Path, description = "Post identifier")),
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Post deleted", body = DataEnvelope<DeletePostResponse>),
        (status = 403, description = "Caller is neither owner nor admin"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn delete_post(
    State(state): State<AppState>,
    ctx: PostContext,
) -> Result<Json<DataEnvelope<DeletePostResponse>>, ApiError> {
    require_role(&state, &ctx.user, &ctx.post, ADMIN_ROLE).await?;

    state.storage.posts().delete(ctx.post.id).await?;

    info!(post_id = ctx.post.id, user_id = ctx.user.id, "Post deleted");
    Ok(Json(DataEnvelope::new(DeletePostResponse {
        post_id: ctx.post.id,
        message: "Post deleted successfully".to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/v1/posts/{post_id}/comments",
    params(("post_id" = i64, Path, description = "Post identifier")),
    request_body = CreateCommentPayload,
    tag = "Posts",
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Comment created", body = DataEnvelope<Comment>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "No such post"),
    )
)]
pub async fn create_comment(
    State(state): State<AppState>,
    ctx: PostContext,
    JsonBody(payload): JsonBody<CreateCommentPayload>,
) -> Result<(StatusCode, Json<DataEnvelope<Comment>>), ApiError> {
    payload.validate()?;

    let comment = state
        .storage
        .comments()
        .create(NewComment {
            post_id: ctx.post.id,
            user_id: ctx.user.id,
            content: payload.content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataEnvelope::new(comment))))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{seed_user, send, test_app};
    use crate::auth::roles::{ADMIN_ROLE, MODERATOR_ROLE};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    async fn create(app: &axum::Router, token: &str, title: &str) -> Value {
        let (status, body) = send(
            app,
            Method::POST,
            "/v1/posts",
            Some(token),
            Some(json!({"title": title, "content": "hello", "tags": ["rust"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"].clone()
    }

    #[tokio::test]
    async fn create_then_get_with_comments() {
        let (state, app, _dir) = test_app();
        let (alice, token) = seed_user(&state, "alice").await;
        let (_, bob_token) = seed_user(&state, "bob").await;

        let post = create(&app, &token, "first").await;
        assert_eq!(post["user_id"], alice.id);
        assert_eq!(post["version"], 0);
        let uri = format!("/v1/posts/{}", post["id"]);

        for (who, text) in [(&token, "one"), (&bob_token, "two")] {
            let (status, _) = send(
                &app,
                Method::POST,
                &format!("{uri}/comments"),
                Some(who),
                Some(json!({"content": text})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(&app, Method::GET, &uri, Some(&bob_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let comments = body["data"]["comments"].as_array().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["content"], "two");
        assert_eq!(comments[0]["user"]["username"], "bob");
    }

    #[tokio::test]
    async fn empty_comment_is_bad_request() {
        let (state, app, _dir) = test_app();
        let (_, token) = seed_user(&state, "alice").await;
        let post = create(&app, &token, "first").await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/v1/posts/{}/comments", post["id"]),
            Some(&token),
            Some(json!({"content": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn owner_updates_and_version_advances() {
        let (state, app, _dir) = test_app();
        let (_, token) = seed_user(&state, "alice").await;
        let post = create(&app, &token, "first").await;
        let uri = format!("/v1/posts/{}", post["id"]);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({"title": "renamed"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "renamed");
        assert_eq!(body["data"]["content"], "hello");
        assert_eq!(body["data"]["version"], 1);

        // A client still holding version 0 loses.
        let (status, _) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({"content": "stale", "version": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({"content": "fresh", "version": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["version"], 2);
    }

    #[tokio::test]
    async fn non_owner_without_role_is_forbidden() {
        let (state, app, _dir) = test_app();
        let (_, owner_token) = seed_user(&state, "alice").await;
        let (_, other_token) = seed_user(&state, "mallory").await;
        let post = create(&app, &owner_token, "first").await;
        let uri = format!("/v1/posts/{}", post["id"]);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&other_token),
            Some(json!({"title": "mine now"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&other_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, &uri, Some(&other_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn higher_roles_act_on_other_users_posts() {
        let (state, app, _dir) = test_app();
        let (_, owner_token) = seed_user(&state, "alice").await;
        let (moderator, moderator_token) = seed_user(&state, "maude").await;
        let (admin, admin_token) = seed_user(&state, "ada").await;
        state
            .storage
            .users()
            .set_role(moderator.id, MODERATOR_ROLE)
            .await
            .unwrap();
        state.storage.users().set_role(admin.id, ADMIN_ROLE).await.unwrap();

        let post = create(&app, &owner_token, "first").await;
        let uri = format!("/v1/posts/{}", post["id"]);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&moderator_token),
            Some(json!({"title": "moderated"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "moderated");
        assert_eq!(body["data"]["version"], 1);
        assert_eq!(body["data"]["user_id"], post["user_id"]);

        // Deleting needs admin.
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&moderator_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["post_id"], post["id"]);

        let (status, _) = send(&app, Method::GET, &uri, Some(&owner_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn owner_deletes_post() {
        let (state, app, _dir) = test_app();
        let (_, token) = seed_user(&state, "alice").await;
        let post = create(&app, &token, "first").await;
        let uri = format!("/v1/posts/{}", post["id"]);

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["post_id"], post["id"]);
        assert_eq!(body["data"]["message"], "Post deleted successfully");

        let (status, _) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
