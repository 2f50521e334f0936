// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require a bearer token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is the stored User behind the token's subject
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::AuthError;
use crate::state::AppState;
use crate::storage::{StorageError, User};

/// Extractor for authenticated users.
///
/// Parses `Authorization: Bearer <token>`, verifies the token and resolves
/// its subject through the identity resolver. A subject that no longer
/// exists is a 401; a failing lookup is a 500.
pub struct Auth(pub User);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved earlier in this request
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let claims = state.tokens.verify(token)?;
        let user_id = claims.user_id().ok_or(AuthError::InvalidSubject)?;

        let user = state
            .identity
            .resolve(user_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => AuthError::UnknownUser,
                other => AuthError::InternalError(other.to_string()),
            })?;

        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::state::test_support::test_state;
    use crate::storage::NewUser;
    use axum::http::Request;

    fn parts(auth: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn seed_user(state: &AppState) -> User {
        state
            .storage
            .users()
            .create(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: String::new(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _dir) = test_state();
        let result = Auth::from_request_parts(&mut parts(None), &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));

        let result =
            Auth::from_request_parts(&mut parts(Some("Token abc".into())), &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_resolves_user() {
        let (state, _dir) = test_state();
        let user = seed_user(&state).await;
        let token = state.tokens.issue_for_user(user.id).unwrap();

        let mut parts = parts(Some(format!("Bearer {token}")));
        let Auth(resolved) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(parts.extensions.get::<User>().is_some());
    }

    #[tokio::test]
    async fn valid_token_for_missing_user_is_unauthorized() {
        let (state, _dir) = test_state();
        let token = state.tokens.issue_for_user(404).unwrap();

        let result =
            Auth::from_request_parts(&mut parts(Some(format!("Bearer {token}"))), &state).await;
        assert!(matches!(result, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn non_numeric_subject_is_rejected() {
        let (state, _dir) = test_state();
        let now = chrono::Utc::now().timestamp();
        let token = state
            .tokens
            .issue(&Claims {
                sub: "user_abc".into(),
                iat: now,
                nbf: now,
                exp: now + 60,
                iss: state.config.token.issuer.clone(),
                aud: state.config.token.audience.clone(),
            })
            .unwrap();

        let result =
            Auth::from_request_parts(&mut parts(Some(format!("Bearer {token}"))), &state).await;
        assert!(matches!(result, Err(AuthError::InvalidSubject)));
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let (state, _dir) = test_state();
        let user = seed_user(&state).await;
        let mut token = state.tokens.issue_for_user(user.id).unwrap();
        token.push('x');

        let result =
            Auth::from_request_parts(&mut parts(Some(format!("Bearer {token}"))), &state).await;
        assert!(result.is_err());
    }
}
