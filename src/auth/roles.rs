// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const USER_ROLE: &str = "user";
pub const MODERATOR_ROLE: &str = "moderator";
pub const ADMIN_ROLE: &str = "admin";

/// A named privilege level.
///
/// ## Role Hierarchy
///
/// Roles are totally ordered by `level`; a higher level carries every
/// privilege of the lower ones.
///
/// - `admin` (3) - can delete any post
/// - `moderator` (2) - can edit any post
/// - `user` (1) - can only edit or delete own posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub level: i32,
}

impl Role {
    /// Roles seeded into a fresh database.
    pub fn defaults() -> Vec<Role> {
        vec![
            Role {
                id: 1,
                name: USER_ROLE.to_string(),
                description: "A user can create posts and comments".to_string(),
                level: 1,
            },
            Role {
                id: 2,
                name: MODERATOR_ROLE.to_string(),
                description: "A moderator can update other users posts".to_string(),
                level: 2,
            },
            Role {
                id: 3,
                name: ADMIN_ROLE.to_string(),
                description: "An admin can update and delete other users posts".to_string(),
                level: 3,
            },
        ]
    }

    /// Check if this role has at least the privileges of `required`.
    pub fn has_privilege(&self, required: &Role) -> bool {
        self.level >= required.level
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
