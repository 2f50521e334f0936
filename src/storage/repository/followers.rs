// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Follow relationships, keyed by `(follower, followed)`.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{with_tx, Storage, StorageError, StorageResult, FOLLOWERS, USERS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Follower {
    /// The user who follows
    pub user_id: i64,
    /// The user being followed
    pub follower_id: i64,
    pub created_at: DateTime<Utc>,
}

pub struct FollowerRepository<'a> {
    storage: &'a Storage,
}

impl<'a> FollowerRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Make `user_id` follow `to_follow_id`.
    ///
    /// Following twice is `AlreadyFollowing`; an unknown target is `NotFound`.
    pub async fn follow(&self, to_follow_id: i64, user_id: i64) -> StorageResult<Follower> {
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    if txn.open_table(USERS)?.get(to_follow_id)?.is_none() {
                        return Err(StorageError::NotFound(format!("User {to_follow_id}")));
                    }

                    let mut followers = txn.open_table(FOLLOWERS)?;
                    if followers.get((user_id, to_follow_id))?.is_some() {
                        return Err(StorageError::AlreadyFollowing);
                    }

                    let created_at = Utc::now();
                    followers.insert((user_id, to_follow_id), created_at.timestamp())?;
                    Ok(Follower {
                        user_id,
                        follower_id: to_follow_id,
                        created_at,
                    })
                })
            })
            .await
    }

    /// Remove the relationship if present. Unfollowing a stranger is a no-op.
    pub async fn unfollow(&self, to_unfollow_id: i64, user_id: i64) -> StorageResult<()> {
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    txn.open_table(FOLLOWERS)?
                        .remove((user_id, to_unfollow_id))?;
                    Ok(())
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::NewUser;
    use crate::storage::test_support::temp_storage;

    async fn user(storage: &Storage, name: &str) -> i64 {
        storage
            .users()
            .create(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: String::new(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn follow_twice_is_already_following() {
        let (storage, _dir) = temp_storage();
        let alice = user(&storage, "alice").await;
        let bob = user(&storage, "bob").await;

        let follow = storage.followers().follow(bob, alice).await.unwrap();
        assert_eq!(follow.user_id, alice);
        assert_eq!(follow.follower_id, bob);

        let err = storage.followers().follow(bob, alice).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyFollowing));

        // The reverse direction is a different relationship
        storage.followers().follow(alice, bob).await.unwrap();
    }

    #[tokio::test]
    async fn unfollow_allows_following_again() {
        let (storage, _dir) = temp_storage();
        let alice = user(&storage, "alice").await;
        let bob = user(&storage, "bob").await;

        storage.followers().follow(bob, alice).await.unwrap();
        storage.followers().unfollow(bob, alice).await.unwrap();
        storage.followers().unfollow(bob, alice).await.unwrap();
        storage.followers().follow(bob, alice).await.unwrap();
    }

    #[tokio::test]
    async fn following_unknown_user_is_not_found() {
        let (storage, _dir) = temp_storage();
        let alice = user(&storage, "alice").await;

        let err = storage.followers().follow(77, alice).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
