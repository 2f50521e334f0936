// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthorizationGate, IdentityResolver, TokenAuthenticator};
use crate::config::Config;
use crate::mailer::Mailer;
use crate::ratelimit::FixedWindowRateLimiter;
use crate::storage::{LruUserCache, Storage, UserCache};

/// Shared handles for every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Storage,
    pub tokens: Arc<TokenAuthenticator>,
    pub identity: IdentityResolver,
    pub gate: AuthorizationGate,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limiter: Arc<FixedWindowRateLimiter>,
}

impl AppState {
    pub fn new(config: Config, storage: Storage, mailer: Arc<dyn Mailer>) -> Self {
        let cache: Option<Arc<dyn UserCache>> = if config.user_cache.enabled {
            Some(Arc::new(LruUserCache::new(
                config.user_cache.capacity,
                config.user_cache.ttl,
            )))
        } else {
            None
        };

        Self {
            tokens: Arc::new(TokenAuthenticator::new(&config.token)),
            identity: IdentityResolver::new(storage.clone(), cache),
            gate: AuthorizationGate::new(storage.clone()),
            rate_limiter: Arc::new(FixedWindowRateLimiter::new(
                config.rate_limiter.requests_per_window,
                config.rate_limiter.window,
            )),
            config: Arc::new(config),
            storage,
            mailer,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::mailer::LogMailer;
    use crate::storage::test_support::temp_storage;

    /// State over a fresh temp database with default config and a log mailer.
    pub fn test_state() -> (AppState, tempfile::TempDir) {
        test_state_with(Config::default(), Arc::new(LogMailer))
    }

    pub fn test_state_with(config: Config, mailer: Arc<dyn Mailer>) -> (AppState, tempfile::TempDir) {
        let (storage, dir) = temp_storage();
        (AppState::new(config, storage, mailer), dir)
    }
}
