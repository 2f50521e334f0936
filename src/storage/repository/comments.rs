// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Comment repository.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{
    next_id, with_tx, Storage, StorageError, StorageResult, COMMENTS, POSTS, POST_COMMENTS, USERS,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: CommentAuthor,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommentRecord {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AuthorName {
    username: String,
}

pub struct CommentRepository<'a> {
    storage: &'a Storage,
}

impl<'a> CommentRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Insert a comment on an existing post.
    pub async fn create(&self, new_comment: NewComment) -> StorageResult<Comment> {
        self.storage
            .run(move |db, cancel| {
                with_tx(db, cancel, |txn| {
                    if txn.open_table(POSTS)?.get(new_comment.post_id)?.is_none() {
                        return Err(StorageError::NotFound(format!(
                            "Post {}",
                            new_comment.post_id
                        )));
                    }
                    let username = match txn.open_table(USERS)?.get(new_comment.user_id)? {
                        Some(value) => {
                            serde_json::from_slice::<AuthorName>(value.value())?.username
                        }
                        None => {
                            return Err(StorageError::NotFound(format!(
                                "User {}",
                                new_comment.user_id
                            )))
                        }
                    };

                    let id = next_id(txn, "comments")?;
                    let now = Utc::now();
                    let record = CommentRecord {
                        id,
                        post_id: new_comment.post_id,
                        user_id: new_comment.user_id,
                        content: new_comment.content,
                        created_at: now,
                        updated_at: now,
                    };
                    let json = serde_json::to_vec(&record)?;
                    txn.open_table(COMMENTS)?.insert(id, json.as_slice())?;
                    txn.open_table(POST_COMMENTS)?
                        .insert((record.post_id, id), ())?;

                    Ok(into_comment(record, username))
                })
            })
            .await
    }

    /// All comments on a post with their authors, newest first.
    pub async fn get_by_post_id(&self, post_id: i64) -> StorageResult<Vec<Comment>> {
        self.storage
            .run(move |db, _| {
                let txn = db.begin_read()?;
                let index = txn.open_table(POST_COMMENTS)?;
                let comments = txn.open_table(COMMENTS)?;
                let users = txn.open_table(USERS)?;

                let mut result = Vec::new();
                for entry in index.range((post_id, i64::MIN)..=(post_id, i64::MAX))? {
                    let (key, _) = entry?;
                    let comment_id = key.value().1;
                    let Some(value) = comments.get(comment_id)? else {
                        continue;
                    };
                    let record: CommentRecord = serde_json::from_slice(value.value())?;

                    // Comments whose author is gone are dropped, like an inner join
                    let Some(author) = users.get(record.user_id)? else {
                        continue;
                    };
                    let username = serde_json::from_slice::<AuthorName>(author.value())?.username;
                    result.push(into_comment(record, username));
                }

                result.sort_by(|a, b| {
                    b.created_at
                        .cmp(&a.created_at)
                        .then(b.id.cmp(&a.id))
                });
                Ok(result)
            })
            .await
    }
}

fn into_comment(record: CommentRecord, username: String) -> Comment {
    Comment {
        id: record.id,
        post_id: record.post_id,
        user_id: record.user_id,
        content: record.content,
        created_at: record.created_at,
        updated_at: record.updated_at,
        user: CommentAuthor {
            id: record.user_id,
            username,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::{NewPost, NewUser};
    use crate::storage::test_support::temp_storage;

    async fn setup(storage: &Storage) -> (i64, i64) {
        let user = storage
            .users()
            .create(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: String::new(),
            })
            .await
            .unwrap();
        let post = storage
            .posts()
            .create(NewPost {
                title: "t".into(),
                content: "c".into(),
                user_id: user.id,
                tags: vec![],
            })
            .await
            .unwrap();
        (user.id, post.id)
    }

    #[tokio::test]
    async fn comments_come_back_newest_first_with_author() {
        let (storage, _dir) = temp_storage();
        let (user_id, post_id) = setup(&storage).await;

        for content in ["first", "second", "third"] {
            storage
                .comments()
                .create(NewComment {
                    post_id,
                    user_id,
                    content: content.into(),
                })
                .await
                .unwrap();
        }

        let comments = storage.comments().get_by_post_id(post_id).await.unwrap();
        let contents: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["third", "second", "first"]);
        assert_eq!(comments[0].user.username, "alice");
        assert_eq!(comments[0].user.id, user_id);
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_not_found() {
        let (storage, _dir) = temp_storage();
        let (user_id, _) = setup(&storage).await;

        let err = storage
            .comments()
            .create(NewComment {
                post_id: 404,
                user_id,
                content: "x".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn other_posts_comments_are_not_mixed_in() {
        let (storage, _dir) = temp_storage();
        let (user_id, post_id) = setup(&storage).await;
        storage
            .comments()
            .create(NewComment {
                post_id,
                user_id,
                content: "x".into(),
            })
            .await
            .unwrap();

        assert!(storage
            .comments()
            .get_by_post_id(post_id + 1)
            .await
            .unwrap()
            .is_empty());
    }
}
