// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Social API - REST backend for a social network
//!
//! Users register and activate by email, follow each other, publish posts
//! and comments, and read a personal feed. Access tokens are HS256 JWTs;
//! state lives in an embedded redb database.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token and Basic authentication, role-based authorization
//! - `mailer` - Transactional email (SendGrid)
//! - `ratelimit` - Fixed-window per-client rate limiting
//! - `storage` - Repositories over redb, user cache, feed queries

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod models;
pub mod ratelimit;
pub mod state;
pub mod storage;
