// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims issued and accepted by this service.

use serde::{Deserialize, Serialize};

/// Registered claims carried by every access token.
///
/// All timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id as a decimal string
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Not before
    pub nbf: i64,
    /// Expiration
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

impl Claims {
    /// The user id named by `sub`, if it is one.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
