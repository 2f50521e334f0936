// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users are keyed by a sequential id with unique secondary indexes on the
//! lowercased email and on the username. Pending account activations live in
//! `user_invitations`, keyed by the SHA-256 hex of the plain token; the plain
//! token itself is never stored.

use std::time::Duration;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::auth::roles::{Role, USER_ROLE};

use super::super::{
    next_id, with_tx, Storage, StorageError, StorageResult, INVITATIONS, ROLES, USERS,
    USERS_BY_EMAIL, USERS_BY_USERNAME,
};

/// A registered user, with its role resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub role: Role,
}

/// Input for a user insert. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// On-disk shape of a user; the role is stored by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InvitationRecord {
    user_id: i64,
    expiry: DateTime<Utc>,
}

/// SHA-256 hex digest under which an invitation token is stored.
pub fn invitation_token_hash(plain_token: &str) -> String {
    format!("{:x}", Sha256::digest(plain_token.as_bytes()))
}

pub struct UserRepository<'a> {
    storage: &'a Storage,
}

impl<'a> UserRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Get a user by id.
    pub async fn get_by_id(&self, user_id: i64) -> StorageResult<User> {
        self.storage
            .run(move |db, _| {
                let txn = db.begin_read()?;
                let users = txn.open_table(USERS)?;
                let roles = txn.open_table(ROLES)?;
                let record = read_record(&users, user_id)?;
                into_user(record, &roles)
            })
            .await
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> StorageResult<User> {
        let email = email.to_lowercase();
        self.storage
            .run(move |db, _| {
                let txn = db.begin_read()?;
                let by_email = txn.open_table(USERS_BY_EMAIL)?;
                let user_id = by_email
                    .get(email.as_str())?
                    .map(|v| v.value())
                    .ok_or_else(|| StorageError::NotFound(format!("User {email}")))?;

                let users = txn.open_table(USERS)?;
                let roles = txn.open_table(ROLES)?;
                into_user(read_record(&users, user_id)?, &roles)
            })
            .await
    }

    /// Insert a user with the default role.
    pub async fn create(&self, new_user: NewUser) -> StorageResult<User> {
        self.storage
            .run(move |db, cancel| with_tx(db, cancel, |txn| insert_user(txn, &new_user)))
            .await
    }

    /// Insert a user and its activation invitation atomically.
    pub async fn create_and_invite(
        &self,
        new_user: NewUser,
        plain_token: &str,
        invitation_ttl: Duration,
    ) -> StorageResult<User> {
        let token_hash = invitation_token_hash(plain_token);
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    let user = insert_user(txn, &new_user)?;

                    let ttl = chrono::Duration::from_std(invitation_ttl)
                        .map_err(|e| StorageError::Integrity(e.to_string()))?;
                    let invitation = InvitationRecord {
                        user_id: user.id,
                        expiry: Utc::now() + ttl,
                    };
                    let json = serde_json::to_vec(&invitation)?;
                    txn.open_table(INVITATIONS)?
                        .insert(token_hash.as_str(), json.as_slice())?;

                    Ok(user)
                })
            })
            .await
    }

    /// Activate the account owning an unexpired invitation token.
    ///
    /// Marks the user active and drops all of its invitations in one
    /// transaction. Unknown or expired tokens are `NotFound`.
    pub async fn activate(&self, plain_token: &str) -> StorageResult<()> {
        let token_hash = invitation_token_hash(plain_token);
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    let invitation: InvitationRecord = {
                        let invitations = txn.open_table(INVITATIONS)?;
                        let value = invitations.get(token_hash.as_str())?.ok_or_else(|| {
                            StorageError::NotFound("Invitation".to_string())
                        })?;
                        serde_json::from_slice(value.value())?
                    };
                    if invitation.expiry <= Utc::now() {
                        return Err(StorageError::NotFound("Invitation".to_string()));
                    }

                    let mut users = txn.open_table(USERS)?;
                    let mut record = read_record(&users, invitation.user_id)?;
                    record.is_active = true;
                    record.updated_at = Utc::now();
                    let json = serde_json::to_vec(&record)?;
                    users.insert(record.id, json.as_slice())?;
                    drop(users);

                    delete_invitations(txn, invitation.user_id)
                })
            })
            .await
    }

    /// Assign the role named `role_name` to a user.
    ///
    /// Unknown users and unknown roles are both `NotFound`.
    pub async fn set_role(&self, user_id: i64, role_name: &str) -> StorageResult<User> {
        let role_name = role_name.to_string();
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    let roles = txn.open_table(ROLES)?;
                    if roles.get(role_name.as_str())?.is_none() {
                        return Err(StorageError::NotFound(format!("Role {role_name}")));
                    }

                    let mut users = txn.open_table(USERS)?;
                    let mut record = read_record(&users, user_id)?;
                    record.role = role_name.clone();
                    record.updated_at = Utc::now();
                    let json = serde_json::to_vec(&record)?;
                    users.insert(record.id, json.as_slice())?;

                    into_user(record, &roles)
                })
            })
            .await
    }

    /// Delete a user together with its pending invitations.
    pub async fn delete(&self, user_id: i64) -> StorageResult<()> {
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    let record = {
                        let mut users = txn.open_table(USERS)?;
                        let removed = users.remove(user_id)?.ok_or_else(|| {
                            StorageError::NotFound(format!("User {user_id}"))
                        })?;
                        serde_json::from_slice::<UserRecord>(removed.value())?
                    };

                    txn.open_table(USERS_BY_EMAIL)?
                        .remove(record.email.to_lowercase().as_str())?;
                    txn.open_table(USERS_BY_USERNAME)?
                        .remove(record.username.as_str())?;

                    delete_invitations(txn, user_id)
                })
            })
            .await
    }
}

fn read_record<T>(users: &T, user_id: i64) -> StorageResult<UserRecord>
where
    T: ReadableTable<i64, &'static [u8]>,
{
    match users.get(user_id)? {
        Some(value) => Ok(serde_json::from_slice(value.value())?),
        None => Err(StorageError::NotFound(format!("User {user_id}"))),
    }
}

fn into_user<T>(record: UserRecord, roles: &T) -> StorageResult<User>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let role: Role = match roles.get(record.role.as_str())? {
        Some(value) => serde_json::from_slice(value.value())?,
        None => {
            return Err(StorageError::Integrity(format!(
                "user {} references unknown role {}",
                record.id, record.role
            )))
        }
    };

    Ok(User {
        id: record.id,
        username: record.username,
        email: record.email,
        password_hash: record.password_hash,
        is_active: record.is_active,
        created_at: record.created_at,
        updated_at: record.updated_at,
        role,
    })
}

fn insert_user(txn: &WriteTransaction, new_user: &NewUser) -> StorageResult<User> {
    let email_key = new_user.email.to_lowercase();

    let mut by_email = txn.open_table(USERS_BY_EMAIL)?;
    if by_email.get(email_key.as_str())?.is_some() {
        return Err(StorageError::DuplicateEmail);
    }
    let mut by_username = txn.open_table(USERS_BY_USERNAME)?;
    if by_username.get(new_user.username.as_str())?.is_some() {
        return Err(StorageError::DuplicateUsername);
    }

    let id = next_id(txn, "users")?;
    let now = Utc::now();
    let record = UserRecord {
        id,
        username: new_user.username.clone(),
        email: new_user.email.clone(),
        password_hash: new_user.password_hash.clone(),
        is_active: false,
        created_at: now,
        updated_at: now,
        role: USER_ROLE.to_string(),
    };

    let json = serde_json::to_vec(&record)?;
    txn.open_table(USERS)?.insert(id, json.as_slice())?;
    by_email.insert(email_key.as_str(), id)?;
    by_username.insert(new_user.username.as_str(), id)?;

    let roles = txn.open_table(ROLES)?;
    into_user(record, &roles)
}

fn delete_invitations(txn: &WriteTransaction, user_id: i64) -> StorageResult<()> {
    let mut invitations = txn.open_table(INVITATIONS)?;

    let mut hashes = Vec::new();
    for entry in invitations.iter()? {
        let (key, value) = entry?;
        let invitation: InvitationRecord = serde_json::from_slice(value.value())?;
        if invitation.user_id == user_id {
            hashes.push(key.value().to_string());
        }
    }

    for hash in hashes {
        invitations.remove(hash.as_str())?;
    }
    Ok(())
}
