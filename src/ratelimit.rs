// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Fixed-Window Rate Limiting
//!
//! Per-client admission control. Every client key (the remote IP) gets a
//! counter anchored at its first request. Requests are admitted while the
//! counter is below the limit; once the window has elapsed the whole entry is
//! discarded and the next request opens a fresh window.
//!
//! ## Expiry
//!
//! Stale windows are dropped lazily on the next `allow` for that key and by a
//! single background sweep ([`FixedWindowRateLimiter::run_sweeper`]), so the
//! number of background tasks does not grow with the number of clients.
//!
//! ## HTTP
//!
//! [`rate_limit_middleware`] rejects with `429 Too Many Requests` and a
//! `Retry-After` header carrying the window length in seconds.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ApiError;

/// Admission control seam used by the HTTP layer.
pub trait Limiter: Send + Sync {
    /// Record a request for `client_key`.
    ///
    /// Returns whether the request is admitted and, when it is not, how long
    /// the client should wait before retrying.
    fn allow(&self, client_key: &str) -> (bool, Duration);
}

/// Counter for one client inside its current window.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    started_at: Instant,
}

/// Fixed-window limiter with process-local state.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    clients: Mutex<HashMap<String, RateWindow>>,
    limit: u32,
    window: Duration,
}

impl FixedWindowRateLimiter {
    /// Create a limiter admitting `limit` requests per `window` per client.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            limit,
            window,
        }
    }

    /// Number of clients currently holding a window (stale ones included
    /// until the next sweep).
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Drop every window that has fully elapsed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, w| now.duration_since(w.started_at) < self.window);
        before - clients.len()
    }

    /// Run the periodic sweep until `shutdown` is cancelled.
    ///
    /// ```rust,ignore
    /// tokio::spawn(limiter.clone().run_sweeper(shutdown.clone()));
    /// ```
    pub async fn run_sweeper(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            window_secs = self.window.as_secs(),
            "Rate limiter sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.window) => {
                    let removed = self.sweep();
                    if removed > 0 {
                        debug!(removed, "Swept expired rate limit windows");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Rate limiter sweeper shutting down");
                    return;
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        // A panic while holding the lock cannot leave a window half-written.
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Limiter for FixedWindowRateLimiter {
    fn allow(&self, client_key: &str) -> (bool, Duration) {
        let now = Instant::now();
        let mut clients = self.lock();

        match clients.get_mut(client_key) {
            Some(window) if now.duration_since(window.started_at) < self.window => {
                if window.count < self.limit {
                    window.count += 1;
                    (true, Duration::ZERO)
                } else {
                    // Retry hint is the full window, not the time remaining.
                    (false, self.window)
                }
            }
            _ => {
                if self.limit == 0 {
                    return (false, self.window);
                }
                clients.insert(
                    client_key.to_string(),
                    RateWindow {
                        count: 1,
                        started_at: now,
                    },
                );
                (true, Duration::ZERO)
            }
        }
    }
}

/// Derive the client key for a request.
///
/// Proxy headers win over the socket address, matching a deployment behind
/// a TLS-terminating reverse proxy.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware rejecting requests over the per-client limit.
///
/// ```rust,ignore
/// router.layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware))
/// ```
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<dyn Limiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    let (allowed, retry_after) = limiter.allow(&key);
    if !allowed {
        debug!(client = %key, retry_after_secs = retry_after.as_secs(), "Rate limit exceeded");
        return ApiError::rate_limited(retry_after).into_response();
    }

    next.run(request).await
}
