// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration and token issuance.
//!
//! Registration is a two-step SAGA: the user and its invitation are written
//! in one transaction, then the welcome email is sent. If the email cannot
//! be delivered the user is deleted again and the caller gets a 500.

use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use super::JsonBody;
use crate::{
    auth::password::{hash_password, verify_password},
    error::ApiError,
    mailer::{Template, TemplateVars},
    models::{CreateTokenPayload, DataEnvelope, RegisterUserPayload, UserWithToken},
    state::AppState,
    storage::{NewUser, StorageError},
};

#[utoipa::path(
    post,
    path = "/v1/authentication/user",
    request_body = RegisterUserPayload,
    tag = "Authentication",
    responses(
        (status = 201, description = "User registered, activation email sent", body = DataEnvelope<UserWithToken>),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email or username already taken"),
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterUserPayload>,
) -> Result<(StatusCode, Json<DataEnvelope<UserWithToken>>), ApiError> {
    payload.validate()?;

    let password_hash = hash_password(payload.password)
        .await
        .map_err(ApiError::internal)?;

    let plain_token = Uuid::new_v4().to_string();
    let user = state
        .storage
        .users()
        .create_and_invite(
            NewUser {
                username: payload.username,
                email: payload.email,
                password_hash,
            },
            &plain_token,
            state.config.mail.invitation_ttl,
        )
        .await?;

    let vars = TemplateVars::from([
        ("username", user.username.clone()),
        (
            "activation_url",
            format!(
                "{}/confirm/{plain_token}",
                state.config.frontend_url.trim_end_matches('/')
            ),
        ),
    ]);

    if let Err(mail_err) = state
        .mailer
        .send(
            Template::UserWelcome,
            &user.username,
            &user.email,
            &vars,
            !state.config.is_production(),
        )
        .await
    {
        error!(error = %mail_err, email = %user.email, "Failed to send welcome email");

        if let Err(rollback_err) = state.storage.users().delete(user.id).await {
            error!(
                error = %rollback_err,
                user_id = user.id,
                "Failed to roll back user creation after email failure"
            );
        }
        return Err(ApiError::internal(mail_err));
    }

    info!(user_id = user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(DataEnvelope::new(UserWithToken {
            user,
            token: plain_token,
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/authentication/token",
    request_body = CreateTokenPayload,
    tag = "Authentication",
    responses(
        (status = 201, description = "Signed access token", body = DataEnvelope<String>),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unknown email or wrong password"),
    )
)]
pub async fn create_token(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateTokenPayload>,
) -> Result<(StatusCode, Json<DataEnvelope<String>>), ApiError> {
    payload.validate()?;

    let user = match state.storage.users().get_by_email(&payload.email).await {
        Ok(user) => user,
        Err(StorageError::NotFound(_)) => return Err(ApiError::unauthorized("unauthorized")),
        Err(e) => return Err(ApiError::internal(e)),
    };

    let matches = verify_password(user.password_hash.clone(), payload.password)
        .await
        .map_err(ApiError::internal)?;
    if !matches {
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let token = state
        .tokens
        .issue_for_user(user.id)
        .map_err(ApiError::internal)?;

    Ok((StatusCode::CREATED, Json(DataEnvelope::new(token))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{send, test_app};
    use crate::config::Config;
    use crate::mailer::{Mailer, MailerError};
    use crate::state::test_support::test_state_with;
    use async_trait::async_trait;
    use axum::http::Method;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Records every send and optionally fails it.
    #[derive(Default)]
    struct RecordingMailer {
        fail: bool,
        sent: Mutex<Vec<(String, String, bool)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(
            &self,
            _template: Template,
            _recipient_name: &str,
            recipient_email: &str,
            vars: &TemplateVars,
            sandbox: bool,
        ) -> Result<(), MailerError> {
            self.sent.lock().unwrap().push((
                recipient_email.to_string(),
                vars["activation_url"].clone(),
                sandbox,
            ));
            if self.fail {
                return Err(MailerError::RetriesExhausted {
                    recipient: recipient_email.to_string(),
                    attempts: 3,
                    last_error: "boom".into(),
                });
            }
            Ok(())
        }
    }

    /// Removes the recipient from storage before failing, so the
    /// registration rollback finds nothing to delete.
    struct UserRemovingMailer {
        storage: crate::storage::Storage,
    }

    #[async_trait]
    impl Mailer for UserRemovingMailer {
        async fn send(
            &self,
            _template: Template,
            _recipient_name: &str,
            recipient_email: &str,
            _vars: &TemplateVars,
            _sandbox: bool,
        ) -> Result<(), MailerError> {
            let user = self.storage.users().get_by_email(recipient_email).await.unwrap();
            self.storage.users().delete(user.id).await.unwrap();
            Err(MailerError::RetriesExhausted {
                recipient: recipient_email.to_string(),
                attempts: 3,
                last_error: "boom".into(),
            })
        }
    }

    fn registration(name: &str) -> Value {
        json!({
            "username": name,
            "email": format!("{name}@example.com"),
            "password": "correct horse",
        })
    }

    #[tokio::test]
    async fn register_sends_activation_link_and_returns_token() {
        let mailer = Arc::new(RecordingMailer::default());
        let (state, _dir) = test_state_with(Config::default(), mailer.clone());
        let app = crate::api::router(state.clone());

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(registration("alice")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let token = body["data"]["token"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["is_active"], false);
        assert!(body["data"].get("password_hash").is_none());

        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![(
                "alice@example.com".to_string(),
                format!("http://localhost:3000/confirm/{token}"),
                true
            )]
        );
    }

    #[tokio::test]
    async fn mail_failure_rolls_back_the_user() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let (state, _dir) = test_state_with(Config::default(), mailer.clone());
        let app = crate::api::router(state.clone());

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(registration("alice")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], crate::error::INTERNAL_ERROR_MESSAGE);

        let lookup = state.storage.users().get_by_email("alice@example.com").await;
        assert!(matches!(lookup, Err(StorageError::NotFound(_))));

        // The email and username are free again.
        let state = crate::state::AppState::new(
            Config::default(),
            state.storage.clone(),
            Arc::new(RecordingMailer::default()),
        );
        let app = crate::api::router(state);
        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(registration("alice")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn failed_rollback_still_returns_internal_error() {
        let (storage, _dir) = crate::storage::test_support::temp_storage();
        let mailer = Arc::new(UserRemovingMailer {
            storage: storage.clone(),
        });
        let state = crate::state::AppState::new(Config::default(), storage.clone(), mailer);
        let app = crate::api::router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(registration("alice")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], crate::error::INTERNAL_ERROR_MESSAGE);
        assert!(body.get("data").is_none());

        let lookup = storage.users().get_by_email("alice@example.com").await;
        assert!(matches!(lookup, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (_state, app, _dir) = test_app();

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(registration("alice")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(registration("alice")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_registration_is_bad_request() {
        let (_state, app, _dir) = test_app();

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(json!({"username": "al", "email": "al@example.com", "password": "correct horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn token_is_issued_for_valid_credentials_only() {
        let (state, app, _dir) = test_app();

        send(
            &app,
            Method::POST,
            "/v1/authentication/user",
            None,
            Some(registration("alice")),
        )
        .await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/authentication/token",
            None,
            Some(json!({"email": "alice@example.com", "password": "correct horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let claims = state.tokens.verify(body["data"].as_str().unwrap()).unwrap();
        let user = state.storage.users().get_by_email("alice@example.com").await.unwrap();
        assert_eq!(claims.user_id(), Some(user.id));

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/authentication/token",
            None,
            Some(json!({"email": "alice@example.com", "password": "wrong password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/authentication/token",
            None,
            Some(json!({"email": "nobody@example.com", "password": "correct horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
