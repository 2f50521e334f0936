// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP Basic credentials.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};

use super::AuthError;
use crate::config::BasicAuthConfig;

/// A decoded `username:password` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    /// Parse `Authorization: Basic <base64(username:password)>`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let header = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let encoded = header
            .strip_prefix("Basic ")
            .ok_or(AuthError::InvalidAuthHeader)?;
        let decoded = Base64::decode_vec(encoded.trim()).map_err(|_| AuthError::InvalidAuthHeader)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::InvalidAuthHeader)?;

        // The password may itself contain ':'
        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::InvalidAuthHeader)?;

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Compare against the configured static pair.
    pub fn verify(&self, expected: &BasicAuthConfig) -> Result<(), AuthError> {
        if self.username == expected.username && self.password == expected.password {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
