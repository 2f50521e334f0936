// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token and Basic authentication plus role-based authorization.
//!
//! ## Auth Flow
//!
//! 1. Client obtains a token from `POST /v1/authentication/token`
//! 2. Client sends `Authorization: Bearer <JWT>`
//! 3. Server:
//!    - Verifies HS256 signature, expiry, not-before, issuer, audience
//!    - Resolves `sub` to a stored user (user cache, then storage)
//!    - For post updates and deletes, checks ownership or role level
//!
//! ## Security
//!
//! - The signing algorithm is pinned to HS256
//! - Clock skew tolerance is 60 seconds
//! - The health endpoint uses static Basic credentials instead

pub mod basic;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod middleware;
pub mod ownership;
pub mod password;
pub mod roles;
pub mod token;

pub use basic::BasicCredentials;
pub use claims::Claims;
pub use error::AuthError;
pub use extractor::Auth;
pub use identity::IdentityResolver;
pub use middleware::basic_auth_middleware;
pub use ownership::{AuthorizationGate, OwnedResource};
pub use roles::Role;
pub use token::TokenAuthenticator;
