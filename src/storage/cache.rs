// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for user lookups by id.
//!
//! Sits in front of the users table so the authenticated hot path does not
//! hit redb on every request. Entries expire passively after the TTL; edits
//! to a user are not pushed into the cache.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::repository::users::User;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("user cache lock poisoned")]
    Poisoned,
}

/// Best-effort user cache. Failures are reported but never fatal to callers.
pub trait UserCache: Send + Sync {
    fn get(&self, user_id: i64) -> Result<Option<User>, CacheError>;
    fn set(&self, user: &User) -> Result<(), CacheError>;
}

struct CacheEntry {
    user: User,
    inserted_at: Instant,
}

/// In-process LRU user cache with a per-entry TTL.
pub struct LruUserCache {
    cache: Mutex<LruCache<i64, CacheEntry>>,
    ttl: Duration,
}

impl LruUserCache {
    /// - `capacity`: max number of users held; the least recently used is evicted.
    /// - `ttl`: lifetime of each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserCache for LruUserCache {
    fn get(&self, user_id: i64) -> Result<Option<User>, CacheError> {
        let mut cache = self.cache.lock().map_err(|_| CacheError::Poisoned)?;
        if let Some(entry) = cache.get(&user_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Ok(Some(entry.user.clone()));
            }
            // Expired
            cache.pop(&user_id);
        }
        Ok(None)
    }

    fn set(&self, user: &User) -> Result<(), CacheError> {
        let mut cache = self.cache.lock().map_err(|_| CacheError::Poisoned)?;
        cache.put(
            user.id,
            CacheEntry {
                user: user.clone(),
                inserted_at: Instant::now(),
            },
        );
        Ok(())
    }
}
