// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership and role-precedence authorization.
//!
//! A user may act on a resource they own. Anyone else needs a role whose
//! level is at least that of the role the operation requires. Failing to
//! look up the required role is an error, not a denial.

use crate::storage::{Post, Storage, StorageResult, User};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> i64;
}

impl OwnedResource for Post {
    fn owner_user_id(&self) -> i64 {
        self.user_id
    }
}

#[derive(Clone)]
pub struct AuthorizationGate {
    storage: Storage,
}

impl AuthorizationGate {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Whether `user` may act on something owned by `owner_id` when the
    /// operation requires `required_role`.
    pub async fn authorize(
        &self,
        user: &User,
        owner_id: i64,
        required_role: &str,
    ) -> StorageResult<bool> {
        if user.id == owner_id {
            return Ok(true);
        }

        let required = self.storage.roles().get_by_name(required_role).await?;
        Ok(user.role.has_privilege(&required))
    }

    /// [`authorize`](Self::authorize) against the resource's owner.
    pub async fn authorize_resource<R: OwnedResource>(
        &self,
        user: &User,
        resource: &R,
        required_role: &str,
    ) -> StorageResult<bool> {
        self.authorize(user, resource.owner_user_id(), required_role)
            .await
    }
}
