// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{FromRequest, FromRequestParts},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{basic_auth_middleware, Role},
    error::ApiError,
    models::{
        CreateCommentPayload, CreatePostPayload, CreateTokenPayload, DeletePostResponse,
        RegisterUserPayload, UpdatePostPayload, UserWithToken,
    },
    ratelimit::{rate_limit_middleware, Limiter},
    state::AppState,
    storage::{Comment, CommentAuthor, FeedPost, Post, PostAuthor, User},
};

pub mod auth;
pub mod context;
pub mod feed;
pub mod health;
pub mod posts;
pub mod users;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// JSON body extractor whose rejections use the API error shape.
///
/// Unknown fields are rejected by the payload types themselves.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Path parameter extractor; a value that does not parse is a 400.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

pub fn router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route_layer(middleware::from_fn_with_state(
            Arc::new(state.config.basic_auth.clone()),
            basic_auth_middleware,
        ));

    let v1_routes = Router::new()
        .route("/authentication/user", post(auth::register_user))
        .route("/authentication/token", post(auth::create_token))
        .route("/users/activate/{token}", put(users::activate_user))
        .route("/users/feed", get(feed::get_user_feed))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/follow", put(users::follow_user))
        .route("/users/{user_id}/unfollow", put(users::unfollow_user))
        .route("/posts", post(posts::create_post))
        .route(
            "/posts/{post_id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{post_id}/comments", post(posts::create_comment))
        .merge(health_routes)
        .with_state(state.clone());

    let mut app = Router::new()
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()));

    if state.config.rate_limiter.enabled {
        let limiter: Arc<dyn Limiter> = state.rate_limiter.clone();
        app = app.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    app.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register_user,
        auth::create_token,
        users::activate_user,
        users::get_user,
        users::follow_user,
        users::unfollow_user,
        feed::get_user_feed,
        posts::create_post,
        posts::get_post,
        posts::update_post,
        posts::delete_post,
        posts::create_comment
    ),
    components(
        schemas(
            User,
            Role,
            Post,
            PostAuthor,
            FeedPost,
            Comment,
            CommentAuthor,
            UserWithToken,
            RegisterUserPayload,
            CreateTokenPayload,
            CreatePostPayload,
            UpdatePostPayload,
            CreateCommentPayload,
            DeletePostResponse,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Authentication", description = "Registration and token issuance"),
        (name = "Users", description = "Profiles, follows and activation"),
        (name = "Feed", description = "Personal feed"),
        (name = "Posts", description = "Posts and comments")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "basic",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::mailer::LogMailer;
    use crate::state::{test_support::test_state_with, AppState};
    use crate::storage::{NewUser, User};

    /// Router and state over a temp database, without the rate limiter.
    pub fn test_app() -> (AppState, Router, tempfile::TempDir) {
        let mut config = Config::default();
        config.rate_limiter.enabled = false;
        let (state, dir) = test_state_with(config, std::sync::Arc::new(LogMailer));
        (state.clone(), super::router(state), dir)
    }

    /// Send one request through `app` and decode the JSON body (if any).
    pub async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Store a user directly and return it with a fresh access token.
    pub async fn seed_user(state: &AppState, name: &str) -> (User, String) {
        let user = state
            .storage
            .users()
            .create(NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        let token = state.tokens.issue_for_user(user.id).unwrap();
        (user, token)
    }
}
