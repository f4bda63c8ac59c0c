//! Records as stored and returned by the store.
//!
//! Owner secret digests are written on insert and read only through
//! [`crate::ownership`]; none of the read models below carry them.

use authz::NewOwnership;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Ordering of guestbook entries by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    New,
    Old,
}

impl SortOrder {
    /// Anything other than `old` means newest first
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("old") => SortOrder::Old,
            _ => SortOrder::New,
        }
    }

    pub(crate) fn sql(&self) -> &'static str {
        match self {
            SortOrder::New => "DESC",
            SortOrder::Old => "ASC",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct GuestbookEntry {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct GuestbookReply {
    pub id: String,
    pub entry_id: String,
    pub name: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryWithReplies {
    #[serde(flatten)]
    pub entry: GuestbookEntry,
    pub replies: Vec<GuestbookReply>,
}

/// One page of the guestbook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryPage {
    pub entries: Vec<EntryWithReplies>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_url: Option<String>,
    pub ownership: NewOwnership,
}

#[derive(Debug, Clone)]
pub struct NewReply {
    pub name: String,
    pub content: String,
    pub image_url: Option<String>,
    pub ownership: NewOwnership,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfilePost {
    pub id: String,
    pub title: String,
    pub role: String,
    pub bio: String,
    pub cover_url: String,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Filled in by listings; zero for a freshly created post
    pub comment_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub role: String,
    pub bio: String,
    pub cover_url: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileComment {
    pub id: String,
    pub post_id: String,
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub likes_count: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub ownership: NewOwnership,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentReply {
    pub id: String,
    pub comment_id: String,
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_urls: Vec<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Same shape as [`NewComment`]
pub type NewCommentReply = NewComment;

// Row types for tables with JSON columns.

#[derive(FromRow)]
pub(crate) struct PostRow {
    pub id: String,
    pub title: String,
    pub role: String,
    pub bio: String,
    pub cover_url: String,
    pub image_urls: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub comment_count: i64,
}

impl From<PostRow> for ProfilePost {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            role: row.role,
            bio: row.bio,
            cover_url: row.cover_url,
            image_urls: row.image_urls.0,
            created_at: row.created_at,
            comment_count: row.comment_count,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_urls: Json<Vec<String>>,
    pub likes_count: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentRow> for ProfileComment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            name: row.name,
            avatar: row.avatar,
            content: row.content,
            image_urls: row.image_urls.0,
            likes_count: row.likes_count,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct CommentReplyRow {
    pub id: String,
    pub comment_id: String,
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_urls: Json<Vec<String>>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentReplyRow> for CommentReply {
    fn from(row: CommentReplyRow) -> Self {
        Self {
            id: row.id,
            comment_id: row.comment_id,
            name: row.name,
            avatar: row.avatar,
            content: row.content,
            image_urls: row.image_urls.0,
            is_admin: row.is_admin,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
