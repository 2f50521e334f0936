// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::DataEnvelope;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving
    pub status: String,
    /// Deployment environment
    pub env: String,
    /// Crate version of the running binary
    pub version: String,
}

/// Liveness check, guarded by Basic credentials.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    security(("basic" = [])),
    responses(
        (status = 200, description = "Service is up", body = DataEnvelope<HealthResponse>),
        (status = 401, description = "Missing or wrong Basic credentials"),
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<DataEnvelope<HealthResponse>> {
    Json(DataEnvelope::new(HealthResponse {
        status: "ok".to_string(),
        env: state.config.env.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
