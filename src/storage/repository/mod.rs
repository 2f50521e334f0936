// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the redb tables.
//!
//! Each repository borrows [`Storage`](super::Storage) and exposes the
//! operations for one entity. Every call is async and runs its transaction
//! on the blocking pool through `Storage::run`.

pub mod comments;
pub mod followers;
pub mod posts;
pub mod roles;
pub mod users;

pub use comments::{Comment, CommentAuthor, CommentRepository, NewComment};
pub use followers::{Follower, FollowerRepository};
pub use posts::{FeedPost, NewPost, Post, PostAuthor, PostRepository};
pub use roles::RoleRepository;
pub use users::{NewUser, User, UserRepository};
