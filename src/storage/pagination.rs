// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Feed pagination and filtering parameters.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

/// Timestamp format accepted by `since` / `until`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_FEED_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSort {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FeedQueryError {
    #[error("limit must be a number")]
    InvalidLimit,
    #[error("offset must be a number")]
    InvalidOffset,
    #[error("offset must not be negative")]
    NegativeOffset,
    #[error("sort must be either asc or desc")]
    InvalidSort,
}

/// Raw query string as received. Everything is optional text.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQueryParams {
    /// Page size, 1 to 20 (default 20)
    pub limit: Option<String>,
    /// Number of posts to skip (default 0)
    pub offset: Option<String>,
    /// `asc` or `desc` by creation time (default `desc`)
    pub sort: Option<String>,
    /// Comma separated tags; a post matches if it carries any of them
    pub tags: Option<String>,
    /// Case-insensitive match against title and content
    pub search: Option<String>,
    /// Only posts created at or after `YYYY-MM-DD HH:MM:SS`
    pub since: Option<String>,
    /// Only posts created at or before `YYYY-MM-DD HH:MM:SS`
    pub until: Option<String>,
}

/// Typed feed query. Bounds are checked with [`Validate::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct PaginatedFeedQuery {
    #[validate(range(min = 1, max = 20, message = "must be between 1 and 20"))]
    pub limit: usize,
    pub offset: usize,
    pub sort: FeedSort,
    #[validate(length(max = 5, message = "at most 5 tags are allowed"))]
    pub tags: Vec<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub search: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Default for PaginatedFeedQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_FEED_LIMIT,
            offset: 0,
            sort: FeedSort::Desc,
            tags: Vec::new(),
            search: String::new(),
            since: None,
            until: None,
        }
    }
}

impl PaginatedFeedQuery {
    /// Parse raw query parameters on top of the defaults.
    ///
    /// Only the shape of each value is checked here. Unparsable `since`/`until`
    /// values are ignored rather than rejected.
    pub fn parse(params: &FeedQueryParams) -> Result<Self, FeedQueryError> {
        let mut query = Self::default();

        if let Some(limit) = non_empty(&params.limit) {
            query.limit = limit.parse().map_err(|_| FeedQueryError::InvalidLimit)?;
        }

        if let Some(offset) = non_empty(&params.offset) {
            let offset: i64 = offset.parse().map_err(|_| FeedQueryError::InvalidOffset)?;
            if offset < 0 {
                return Err(FeedQueryError::NegativeOffset);
            }
            query.offset = offset as usize;
        }

        if let Some(sort) = non_empty(&params.sort) {
            query.sort = match sort {
                "asc" => FeedSort::Asc,
                "desc" => FeedSort::Desc,
                _ => return Err(FeedQueryError::InvalidSort),
            };
        }

        if let Some(tags) = non_empty(&params.tags) {
            query.tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(search) = non_empty(&params.search) {
            query.search = search.to_string();
        }

        query.since = non_empty(&params.since).and_then(parse_date_time);
        query.until = non_empty(&params.until).and_then(parse_date_time);

        Ok(query)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
