use authz::{Credentials, VerificationGrant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Credential fields accepted by every write endpoint
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialFields {
    #[serde(rename = "adminKey", default, skip_serializing_if = "Option::is_none")]
    pub admin_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Token from a verify call; honored for replies and comments only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<String>,
}

impl CredentialFields {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.admin_key.as_deref(), self.password.as_deref())
    }
}

/// Guestbook listing query
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEntriesParams {
    /// `new` (default) or `old`
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReplyResponse {
    pub id: String,
    pub entry_id: String,
    pub name: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<database::GuestbookReply> for ReplyResponse {
    fn from(reply: database::GuestbookReply) -> Self {
        Self {
            id: reply.id,
            entry_id: reply.entry_id,
            name: reply.name,
            content: reply.content,
            image_url: reply.image_url,
            is_admin: reply.is_admin,
            created_at: reply.created_at,
            updated_at: reply.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntryResponse {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub replies: Vec<ReplyResponse>,
}

impl From<database::GuestbookEntry> for EntryResponse {
    fn from(entry: database::GuestbookEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            avatar: entry.avatar,
            content: entry.content,
            image_url: entry.image_url,
            is_admin: entry.is_admin,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            replies: Vec::new(),
        }
    }
}

impl From<database::EntryWithReplies> for EntryResponse {
    fn from(item: database::EntryWithReplies) -> Self {
        let mut response = EntryResponse::from(item.entry);
        response.replies = item.replies.into_iter().map(ReplyResponse::from).collect();
        response
    }
}

/// One page of guestbook entries
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntryPageResponse {
    pub entries: Vec<EntryResponse>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl From<database::EntryPage> for EntryPageResponse {
    fn from(page: database::EntryPage) -> Self {
        Self {
            entries: page.entries.into_iter().map(EntryResponse::from).collect(),
            page: page.page,
            limit: page.limit,
            total: page.total,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEntryRequest {
    #[serde(default)]
    pub name: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub content: String,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub auth: CredentialFields,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReplyRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub auth: CredentialFields,
}

/// Edit of a guestbook entry or reply
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateContentRequest {
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub auth: CredentialFields,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntryEnvelope {
    pub entry: EntryResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReplyEnvelope {
    pub reply: ReplyResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: String,
    pub title: String,
    pub role: String,
    pub bio: String,
    pub cover_url: String,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub comment_count: i64,
}

impl From<database::ProfilePost> for PostResponse {
    fn from(post: database::ProfilePost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            role: post.role,
            bio: post.bio,
            cover_url: post.cover_url,
            image_urls: post.image_urls,
            created_at: post.created_at,
            comment_count: post.comment_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostEnvelope {
    pub post: PostResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[serde(rename = "adminKey")]
    pub admin_key: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
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

impl From<database::ProfileComment> for CommentResponse {
    fn from(comment: database::ProfileComment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            name: comment.name,
            avatar: comment.avatar,
            content: comment.content,
            image_urls: comment.image_urls,
            likes_count: comment.likes_count,
            is_admin: comment.is_admin,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentEnvelope {
    pub comment: CommentResponse,
}

/// New comment, or new reply under a comment
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub name: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(flatten)]
    pub auth: CredentialFields,
}

/// Edit of a comment or comment reply. `image_urls` replaces the stored list
/// when present.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    #[serde(default)]
    pub content: String,
    pub image_urls: Option<Vec<String>>,
    #[serde(flatten)]
    pub auth: CredentialFields,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentReplyResponse {
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

impl From<database::CommentReply> for CommentReplyResponse {
    fn from(reply: database::CommentReply) -> Self {
        Self {
            id: reply.id,
            comment_id: reply.comment_id,
            name: reply.name,
            avatar: reply.avatar,
            content: reply.content,
            image_urls: reply.image_urls,
            is_admin: reply.is_admin,
            created_at: reply.created_at,
            updated_at: reply.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentReplyListResponse {
    pub replies: Vec<CommentReplyResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentReplyEnvelope {
    pub reply: CommentReplyResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    pub ok: bool,
    pub likes_count: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrantResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<VerificationGrant> for GrantResponse {
    fn from(grant: VerificationGrant) -> Self {
        Self {
            token: grant.token,
            expires_at: grant.expires_at,
        }
    }
}

/// Successful verify. `grant` is absent when the admin key was used.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant: Option<GrantResponse>,
}

/// Multipart form accepted by the upload endpoint (documentation only)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Sub-folder; letters, digits, `_`, `-` and `/` are kept
    pub folder: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

/// Generic success response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub message: String,
}
