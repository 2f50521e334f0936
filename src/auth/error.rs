// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Challenge sent with every Basic auth rejection.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

/// Authentication error type.
///
/// Every credential problem is a 401 to the caller; the variant only changes
/// the `error_code` in the body. Collaborator failures during identity
/// resolution are 500.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token was signed with an algorithm other than the configured one
    InvalidAlgorithm,
    /// Token has expired
    TokenExpired,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Token audience is invalid
    InvalidAudience,
    /// Token is not yet valid
    TokenNotYetValid,
    /// A required claim is absent
    MissingClaim(String),
    /// `sub` is not a user id
    InvalidSubject,
    /// Token is valid but its subject no longer exists
    UnknownUser,
    /// Basic auth username or password mismatch
    InvalidCredentials,
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidAlgorithm => "invalid_algorithm",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::MissingClaim(_) => "missing_claim",
            AuthError::InvalidSubject => "invalid_subject",
            AuthError::UnknownUser => "unknown_user",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Rejection for the Basic auth pipeline, carrying the challenge header.
    pub fn into_basic_challenge(self) -> Response {
        let mut response = self.into_response();
        if response.status() == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
        }
        response
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => write!(f, "Invalid authorization header format"),
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::InvalidAlgorithm => write!(f, "Token signing algorithm is not accepted"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::MissingClaim(claim) => write!(f, "Token is missing the {claim} claim"),
            AuthError::InvalidSubject => write!(f, "Token subject is invalid"),
            AuthError::UnknownUser => write!(f, "Token subject does not exist"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AuthError::InternalError(ref msg) = self {
            tracing::error!(error = %msg, "authentication failed internally");
            let body = Json(AuthErrorBody {
                error: crate::error::INTERNAL_ERROR_MESSAGE.to_string(),
                error_code: self.error_code().to_string(),
            });
            return (status, body).into_response();
        }

        tracing::debug!(error_code = self.error_code(), "authentication rejected");
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
