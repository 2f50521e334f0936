// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request payloads and response envelopes used by the REST API. Stored
//! entities (users, posts, comments) live with their repositories in
//! [`crate::storage`] and are serialized directly.
//!
//! Every success body is wrapped as `{"data": ...}`; request payloads reject
//! unknown fields and are checked with [`Validate::validate`] before use.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::storage::User;

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// =============================================================================
// Authentication
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserPayload {
    /// 3 to 20 characters
    #[validate(length(min = 3, max = 20, message = "must be 3 to 20 characters"))]
    pub username: String,
    /// At most 100 characters
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 100, message = "must be at most 100 characters")
    )]
    pub email: String,
    /// 8 to 100 characters
    #[validate(length(min = 8, max = 100, message = "must be 8 to 100 characters"))]
    pub password: String,
}

/// Newly registered user plus the plain activation token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithToken {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateTokenPayload {
    #[validate(
        email(message = "must be a valid email address"),
        length(max = 255, message = "must be at most 255 characters")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "is required"))]
    pub password: String,
}

// =============================================================================
// Posts
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreatePostPayload {
    /// 1 to 255 characters
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub title: String,
    /// At most 1000 characters
    #[validate(length(min = 1, max = 1000, message = "must be 1 to 1000 characters"))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostPayload {
    #[validate(length(min = 1, max = 255, message = "must be 1 to 255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub content: Option<String>,
    /// Version the client last saw; defaults to the currently stored one
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletePostResponse {
    pub post_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentPayload {
    /// 1 to 1000 characters
    #[validate(length(min = 1, max = 1000, message = "must be 1 to 1000 characters"))]
    pub content: String,
}
