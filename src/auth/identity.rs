// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Two-tier identity lookup: user cache first, storage second.
//!
//! The cache is best effort. A failed cache read falls through to storage
//! and a failed cache write is only logged. Cached users are not
//! invalidated on change; they age out after the cache TTL.

use std::sync::Arc;

use tracing::warn;

use crate::storage::{Storage, StorageResult, User, UserCache};

#[derive(Clone)]
pub struct IdentityResolver {
    storage: Storage,
    cache: Option<Arc<dyn UserCache>>,
}

impl IdentityResolver {
    /// `cache: None` sends every lookup to storage.
    pub fn new(storage: Storage, cache: Option<Arc<dyn UserCache>>) -> Self {
        Self { storage, cache }
    }

    /// Resolve a user id to the full user.
    pub async fn resolve(&self, user_id: i64) -> StorageResult<User> {
        let Some(cache) = &self.cache else {
            return self.storage.users().get_by_id(user_id).await;
        };

        match cache.get(user_id) {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => {}
            Err(e) => warn!(user_id, error = %e, "User cache read failed"),
        }

        let user = self.storage.users().get_by_id(user_id).await?;

        if let Err(e) = cache.set(&user) {
            warn!(user_id, error = %e, "User cache write failed");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_storage;
    use crate::storage::{CacheError, LruUserCache, NewUser, StorageError};
    use std::time::Duration;

    struct BrokenCache;

    impl UserCache for BrokenCache {
        fn get(&self, _: i64) -> Result<Option<User>, CacheError> {
            Err(CacheError::Poisoned)
        }
        fn set(&self, _: &User) -> Result<(), CacheError> {
            Err(CacheError::Poisoned)
        }
    }

    async fn seed(storage: &Storage) -> i64 {
        storage
            .users()
            .create(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: String::new(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn storage_read_populates_cache() {
        let (storage, _dir) = temp_storage();
        let id = seed(&storage).await;
        let cache = Arc::new(LruUserCache::new(10, Duration::from_secs(60)));
        let resolver = IdentityResolver::new(storage.clone(), Some(cache.clone()));

        let user = resolver.resolve(id).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(cache.get(id).unwrap().unwrap().id, id);

        // Served from cache even once storage no longer has it
        storage.users().delete(id).await.unwrap();
        assert_eq!(resolver.resolve(id).await.unwrap().id, id);
    }

    #[tokio::test]
    async fn cache_failures_are_not_fatal() {
        let (storage, _dir) = temp_storage();
        let id = seed(&storage).await;
        let resolver = IdentityResolver::new(storage, Some(Arc::new(BrokenCache)));

        assert_eq!(resolver.resolve(id).await.unwrap().id, id);
    }

    #[tokio::test]
    async fn missing_user_is_not_found_and_not_cached() {
        let (storage, _dir) = temp_storage();
        let cache = Arc::new(LruUserCache::new(10, Duration::from_secs(60)));
        let resolver = IdentityResolver::new(storage, Some(cache.clone()));

        let err = resolver.resolve(5).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn without_cache_every_lookup_hits_storage() {
        let (storage, _dir) = temp_storage();
        let id = seed(&storage).await;
        let resolver = IdentityResolver::new(storage.clone(), None);

        assert!(resolver.resolve(id).await.is_ok());
        storage.users().delete(id).await.unwrap();
        assert!(resolver.resolve(id).await.is_err());
    }
}
