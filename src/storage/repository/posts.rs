// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post repository.
//!
//! ## Optimistic Concurrency
//!
//! Every post carries a `version`. [`PostRepository::update`] applies a
//! mutation only if the stored version still equals the caller's expected
//! version, then bumps it by one. redb admits a single write transaction at
//! a time, so the compare and the write cannot interleave with another
//! update. A stale version and a missing post are both reported as
//! `NotFound`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::pagination::{FeedSort, PaginatedFeedQuery};
use super::super::{
    next_id, with_tx, Storage, StorageError, StorageResult, COMMENTS, FOLLOWERS, POSTS,
    POST_COMMENTS, USERS,
};
use super::comments::Comment;

/// Author summary attached to feed entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PostAuthor {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by exactly one on every successful update
    pub version: i64,
    pub comments: Vec<Comment>,
    pub user: Option<PostAuthor>,
}

/// A post as listed in a feed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub comments_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub tags: Vec<String>,
}

/// On-disk shape of a post. Comments and author are joined at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PostRecord {
    id: i64,
    title: String,
    content: String,
    user_id: i64,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        Post {
            id: record.id,
            title: record.title,
            content: record.content,
            user_id: record.user_id,
            tags: record.tags,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            comments: Vec::new(),
            user: None,
        }
    }
}

pub struct PostRepository<'a> {
    storage: &'a Storage,
}

impl<'a> PostRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Insert a new post at version 0.
    pub async fn create(&self, new_post: NewPost) -> StorageResult<Post> {
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    let id = next_id(txn, "posts")?;
                    let now = Utc::now();
                    let record = PostRecord {
                        id,
                        title: new_post.title,
                        content: new_post.content,
                        user_id: new_post.user_id,
                        tags: new_post.tags,
                        created_at: now,
                        updated_at: now,
                        version: 0,
                    };
                    let json = serde_json::to_vec(&record)?;
                    txn.open_table(POSTS)?.insert(id, json.as_slice())?;
                    Ok(Post::from(record))
                })
            })
            .await
    }

    /// Get a post by id, without comments.
    pub async fn get_by_id(&self, post_id: i64) -> StorageResult<Post> {
        self.storage
            .run(move |db, _| {
                let txn = db.begin_read()?;
                let posts = txn.open_table(POSTS)?;
                match posts.get(post_id)? {
                    Some(value) => Ok(serde_json::from_slice::<PostRecord>(value.value())?.into()),
                    None => Err(StorageError::NotFound(format!("Post {post_id}"))),
                }
            })
            .await
    }

    /// Delete a post and its comments.
    pub async fn delete(&self, post_id: i64) -> StorageResult<()> {
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    if txn.open_table(POSTS)?.remove(post_id)?.is_none() {
                        return Err(StorageError::NotFound(format!("Post {post_id}")));
                    }

                    let mut index = txn.open_table(POST_COMMENTS)?;
                    let mut comment_ids = Vec::new();
                    for entry in index.range((post_id, i64::MIN)..=(post_id, i64::MAX))? {
                        let (key, _) = entry?;
                        comment_ids.push(key.value().1);
                    }

                    let mut comments = txn.open_table(COMMENTS)?;
                    for comment_id in comment_ids {
                        index.remove((post_id, comment_id))?;
                        comments.remove(comment_id)?;
                    }
                    Ok(())
                })
            })
            .await
    }

    /// Apply `mutation` to the post if its stored version is `expected_version`.
    ///
    /// On success the version is bumped by one and `updated_at` is stamped.
    /// `id`, `user_id`, `created_at` and `version` are not changeable through
    /// the mutation.
    pub async fn update<F>(
        &self,
        post_id: i64,
        expected_version: i64,
        mutation: F,
    ) -> StorageResult<Post>
    where
        F: FnOnce(&mut Post) + Send + 'static,
    {
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    let mut posts = txn.open_table(POSTS)?;
                    let record: PostRecord = match posts.get(post_id)? {
                        Some(value) => serde_json::from_slice(value.value())?,
                        None => return Err(StorageError::NotFound(format!("Post {post_id}"))),
                    };
                    if record.version != expected_version {
                        return Err(StorageError::NotFound(format!(
                            "Post {post_id} at version {expected_version}"
                        )));
                    }

                    let mut post = Post::from(record.clone());
                    mutation(&mut post);

                    let updated = PostRecord {
                        title: post.title,
                        content: post.content,
                        tags: post.tags,
                        updated_at: Utc::now(),
                        version: record.version + 1,
                        ..record
                    };
                    let json = serde_json::to_vec(&updated)?;
                    posts.insert(post_id, json.as_slice())?;
                    Ok(Post::from(updated))
                })
            })
            .await
    }

    /// Posts by `user_id` and by the users it follows, filtered and paged.
    ///
    /// Each entry carries its author's username and its comment count.
    pub async fn get_user_feed(
        &self,
        user_id: i64,
        query: PaginatedFeedQuery,
    ) -> StorageResult<Vec<FeedPost>> {
        self.storage
            .run(move |db, _| {
                let txn = db.begin_read()?;

                let mut authors = HashSet::from([user_id]);
                let followers = txn.open_table(FOLLOWERS)?;
                for entry in followers.range((user_id, i64::MIN)..=(user_id, i64::MAX))? {
                    let (key, _) = entry?;
                    authors.insert(key.value().1);
                }

                let search = query.search.to_lowercase();
                let posts = txn.open_table(POSTS)?;
                let mut matched = Vec::new();
                for entry in posts.iter()? {
                    let (_, value) = entry?;
                    let record: PostRecord = serde_json::from_slice(value.value())?;
                    if authors.contains(&record.user_id) && matches_query(&record, &query, &search)
                    {
                        matched.push(record);
                    }
                }

                matched.sort_by(|a, b| {
                    let ord = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
                    match query.sort {
                        FeedSort::Asc => ord,
                        FeedSort::Desc => ord.reverse(),
                    }
                });

                let users = txn.open_table(USERS)?;
                let index = txn.open_table(POST_COMMENTS)?;
                let mut feed = Vec::new();
                for record in matched.into_iter().skip(query.offset).take(query.limit) {
                    let comments_count = index
                        .range((record.id, i64::MIN)..=(record.id, i64::MAX))?
                        .count() as i64;

                    let username = match users.get(record.user_id)? {
                        Some(value) => {
                            serde_json::from_slice::<AuthorName>(value.value())?.username
                        }
                        None => String::new(),
                    };

                    let mut post = Post::from(record);
                    post.user = Some(PostAuthor {
                        id: post.user_id,
                        username,
                    });
                    feed.push(FeedPost {
                        post,
                        comments_count,
                    });
                }
                Ok(feed)
            })
            .await
    }
}

/// Just the username out of a stored user.
#[derive(Deserialize)]
struct AuthorName {
    username: String,
}

fn matches_query(record: &PostRecord, query: &PaginatedFeedQuery, search: &str) -> bool {
    if !search.is_empty()
        && !record.title.to_lowercase().contains(search)
        && !record.content.to_lowercase().contains(search)
    {
        return false;
    }
    if !query.tags.is_empty() && !record.tags.iter().any(|t| query.tags.contains(t)) {
        return false;
    }
    if query.since.is_some_and(|since| record.created_at < since) {
        return false;
    }
    if query.until.is_some_and(|until| record.created_at > until) {
        return false;
    }
    true
}
