// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Basic authentication middleware for Axum.
//!
//! Guards operator endpoints (health) with a static username/password pair.
//! Bearer-token routes use the [`Auth`](super::Auth) extractor instead.
//!
//! ```rust,ignore
//! let health = Router::new()
//!     .route("/health", get(health_check))
//!     .layer(axum::middleware::from_fn_with_state(
//!         Arc::new(config.basic_auth.clone()),
//!         basic_auth_middleware,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::basic::BasicCredentials;
use crate::config::BasicAuthConfig;

/// Reject requests without the configured Basic credentials.
///
/// Failures are `401` with a `WWW-Authenticate: Basic` challenge.
pub async fn basic_auth_middleware(
    State(expected): State<Arc<BasicAuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let verified = BasicCredentials::from_headers(request.headers())
        .and_then(|credentials| credentials.verify(&expected));

    match verified {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_basic_challenge(),
    }
}
