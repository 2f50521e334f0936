// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable state lives in an embedded redb database (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! ```text
//! users              user_id            → UserRecord (JSON)
//! users_by_email     lowercase email    → user_id
//! users_by_username  username           → user_id
//! user_invitations   sha256(token) hex  → InvitationRecord (JSON)
//! roles              role name          → Role (JSON)
//! posts              post_id            → PostRecord (JSON)
//! comments           comment_id         → CommentRecord (JSON)
//! post_comments      (post_id, id)      → ()
//! followers          (user_id, followed)→ created_at (unix seconds)
//! sequences          table name         → last issued id
//! ```
//!
//! ## Execution Model
//!
//! redb is synchronous, so every repository call runs on the blocking pool
//! through [`Storage::run`], bounded by the configured timeout. Each call
//! owns a [`CancellationToken`] that is cancelled when the awaiting future
//! is dropped or times out; write transactions check it before committing
//! and abort instead.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use tokio_util::sync::CancellationToken;

use crate::auth::roles::Role;

pub mod cache;
pub mod pagination;
pub mod repository;

pub use cache::{CacheError, LruUserCache, UserCache};
pub use pagination::{FeedQueryError, FeedQueryParams, FeedSort, PaginatedFeedQuery};
pub use repository::{
    Comment, CommentAuthor, CommentRepository, FeedPost, Follower, FollowerRepository,
    NewComment, NewPost, NewUser, Post, PostAuthor, PostRepository, RoleRepository, User,
    UserRepository,
};

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<i64, &[u8]> = TableDefinition::new("users");
pub(crate) const USERS_BY_EMAIL: TableDefinition<&str, i64> =
    TableDefinition::new("users_by_email");
pub(crate) const USERS_BY_USERNAME: TableDefinition<&str, i64> =
    TableDefinition::new("users_by_username");
pub(crate) const INVITATIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("user_invitations");
pub(crate) const ROLES: TableDefinition<&str, &[u8]> = TableDefinition::new("roles");
pub(crate) const POSTS: TableDefinition<i64, &[u8]> = TableDefinition::new("posts");
pub(crate) const COMMENTS: TableDefinition<i64, &[u8]> = TableDefinition::new("comments");
pub(crate) const POST_COMMENTS: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("post_comments");
pub(crate) const FOLLOWERS: TableDefinition<(i64, i64), i64> = TableDefinition::new("followers");
const SEQUENCES: TableDefinition<&str, i64> = TableDefinition::new("sequences");

/// Default bound on a single storage call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("email already exists")]
    DuplicateEmail,

    #[error("username already exists")]
    DuplicateUsername,

    #[error("already following this user")]
    AlreadyFollowing,

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("storage call cancelled")]
    Cancelled,

    #[error("storage task failed: {0}")]
    Task(String),

    #[error("stored data is inconsistent: {0}")]
    Integrity(String),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Storage
// =============================================================================

/// Handle to the embedded database. Cheap to clone.
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
    timeout: Duration,
}

impl Storage {
    /// Open (or create) the database at `path` and seed the default roles.
    pub fn open(path: &Path, timeout: Duration) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USERS_BY_EMAIL)?;
            let _ = write_txn.open_table(USERS_BY_USERNAME)?;
            let _ = write_txn.open_table(INVITATIONS)?;
            let _ = write_txn.open_table(POSTS)?;
            let _ = write_txn.open_table(COMMENTS)?;
            let _ = write_txn.open_table(POST_COMMENTS)?;
            let _ = write_txn.open_table(FOLLOWERS)?;
            let _ = write_txn.open_table(SEQUENCES)?;

            let mut roles = write_txn.open_table(ROLES)?;
            for role in Role::defaults() {
                if roles.get(role.name.as_str())?.is_none() {
                    let json = serde_json::to_vec(&role)?;
                    roles.insert(role.name.as_str(), json.as_slice())?;
                }
            }
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Storage opened");

        Ok(Self {
            db: Arc::new(db),
            timeout,
        })
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self)
    }

    pub fn roles(&self) -> RoleRepository<'_> {
        RoleRepository::new(self)
    }

    pub fn posts(&self) -> PostRepository<'_> {
        PostRepository::new(self)
    }

    pub fn comments(&self) -> CommentRepository<'_> {
        CommentRepository::new(self)
    }

    pub fn followers(&self) -> FollowerRepository<'_> {
        FollowerRepository::new(self)
    }

    /// Run `op` against the database on the blocking pool.
    ///
    /// The call is bounded by the storage timeout. If the returned future is
    /// dropped or the timeout fires, the token handed to `op` is cancelled.
    pub(crate) async fn run<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &CancellationToken) -> StorageResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        let task = tokio::task::spawn_blocking(move || op(&db, &cancel));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StorageError::Task(join_err.to_string())),
            Err(_) => Err(StorageError::Timeout(self.timeout)),
        }
    }
}

/// Execute `f` inside one write transaction with all-or-nothing commit.
///
/// Any error from `f` aborts the transaction. A cancelled token aborts it
/// even when `f` succeeded.
pub(crate) fn with_tx<T, F>(db: &Database, cancel: &CancellationToken, f: F) -> StorageResult<T>
where
    F: FnOnce(&WriteTransaction) -> StorageResult<T>,
{
    if cancel.is_cancelled() {
        return Err(StorageError::Cancelled);
    }

    let txn = db.begin_write()?;
    match f(&txn) {
        Ok(value) => {
            if cancel.is_cancelled() {
                abort(txn);
                return Err(StorageError::Cancelled);
            }
            txn.commit()?;
            Ok(value)
        }
        Err(err) => {
            abort(txn);
            Err(err)
        }
    }
}

fn abort(txn: WriteTransaction) {
    if let Err(e) = txn.abort() {
        tracing::error!(error = %e, "Failed to abort write transaction");
    }
}

/// Issue the next id for `sequence` inside `txn`.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StorageResult<i64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}
