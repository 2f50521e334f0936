// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role lookups. Roles are seeded when the database is opened.

use redb::{ReadableDatabase, ReadTransaction};

use crate::auth::roles::Role;

use super::super::{Storage, StorageError, StorageResult, ROLES};

pub struct RoleRepository<'a> {
    storage: &'a Storage,
}

impl<'a> RoleRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Get a role by its name.
    pub async fn get_by_name(&self, name: &str) -> StorageResult<Role> {
        let name = name.to_string();
        self.storage
            .run(move |db, _| {
                let txn = db.begin_read()?;
                read_role(&txn, &name)
            })
            .await
    }
}

pub(crate) fn read_role(txn: &ReadTransaction, name: &str) -> StorageResult<Role> {
    let table = txn.open_table(ROLES)?;
    match table.get(name)? {
        Some(value) => Ok(serde_json::from_slice(value.value())?),
        None => Err(StorageError::NotFound(format!("Role {name}"))),
    }
}
