//! Profile comments and the replies under them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use authz::{ResourceKind, ResourceRef};
use database::{NewComment, NewCommentReply};
use tracing::{info, warn};

use super::{optional, required, DEFAULT_AVATAR};
use crate::{
    error::{ApiError, ApiErrorResponse, ApiResult},
    extract::{AppJson, DeleteCredentials},
    models::{
        CommentEnvelope, CommentListResponse, CommentReplyEnvelope, CommentReplyListResponse,
        CommentReplyResponse, CommentResponse, CreateCommentRequest, CredentialFields,
        LikeResponse, OkResponse, UpdateCommentRequest, VerifyResponse,
    },
    ownership, AppState,
};

/// Fails unless `comment_id` exists and sits under `post_id`
async fn ensure_comment_under_post(
    state: &AppState,
    post_id: &str,
    comment_id: &str,
) -> ApiResult<()> {
    let comment = state
        .db
        .profiles()
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile_comment not found".to_string()))?;

    if comment.post_id != post_id {
        return Err(ApiError::BadRequest(
            "Comment does not belong to this profile".to_string(),
        ));
    }
    Ok(())
}

/// Remove uploaded files released by a delete. Failures are only logged.
async fn remove_images(state: &AppState, urls: &[String]) {
    for url in urls {
        if let Err(e) = state.uploads.remove_by_url(url).await {
            warn!(url = %url, "Failed to remove image: {}", e);
        }
    }
}

/// List comments on a post, most liked first
///
/// GET /api/v1/profiles/{id}/comments
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}/comments",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Comments", body = CommentListResponse)
    ),
    tag = "comments"
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let comments = state.db.profiles().list_comments(&post_id).await?;
    Ok(Json(CommentListResponse {
        comments: comments.into_iter().map(CommentResponse::from).collect(),
    }))
}

/// Comment on a post
///
/// POST /api/v1/profiles/{id}/comments
#[utoipa::path(
    post,
    path = "/api/v1/profiles/{id}/comments",
    params(("id" = String, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentEnvelope),
        (status = 400, description = "Missing field or password too short", body = ApiErrorResponse),
        (status = 404, description = "Post not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    AppJson(body): AppJson<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = required(&body.name, "name is required")?;
    let content = required(&body.content, "content is required")?;
    let ownership = ownership::claim_new(&state, &body.auth).await?;

    let comment = state
        .db
        .profiles()
        .create_comment(
            &post_id,
            NewComment {
                name,
                avatar: optional(body.avatar.as_deref())
                    .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
                content,
                image_urls: body.image_urls,
                ownership,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("profile_post not found".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CommentEnvelope {
            comment: comment.into(),
        }),
    ))
}

/// Edit a comment
///
/// PATCH /api/v1/profiles/{id}/comments/{comment_id}
#[utoipa::path(
    patch,
    path = "/api/v1/profiles/{id}/comments/{comment_id}",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentEnvelope),
        (status = 400, description = "Comment belongs to another post", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Comment not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn update_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    AppJson(body): AppJson<UpdateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = required(&body.content, "content is required")?;
    let target = ResourceRef::new(ResourceKind::ProfileComment, &comment_id).under(&post_id);
    ownership::authorize_mutation(&state, target, &body.auth).await?;

    let comment = state
        .db
        .profiles()
        .update_comment(&comment_id, &content, body.image_urls.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("profile_comment not found".to_string()))?;

    Ok(Json(CommentEnvelope {
        comment: comment.into(),
    }))
}

/// Delete a comment, its replies and its uploaded images
///
/// DELETE /api/v1/profiles/{id}/comments/{comment_id}
#[utoipa::path(
    delete,
    path = "/api/v1/profiles/{id}/comments/{comment_id}",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    request_body = CredentialFields,
    responses(
        (status = 200, description = "Comment deleted", body = OkResponse),
        (status = 400, description = "Comment belongs to another post", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Comment not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    DeleteCredentials(auth): DeleteCredentials,
) -> ApiResult<impl IntoResponse> {
    let target = ResourceRef::new(ResourceKind::ProfileComment, &comment_id).under(&post_id);
    let reason = ownership::authorize_mutation(&state, target, &auth).await?;

    let images = state
        .db
        .profiles()
        .delete_comment(&comment_id)
        .await?
        .unwrap_or_default();
    info!(id = %comment_id, post = %post_id, ?reason, "Profile comment deleted");

    remove_images(&state, &images).await;
    Ok(Json(OkResponse::ok()))
}

/// Like a comment
///
/// POST /api/v1/profiles/{id}/comments/{comment_id}/like
#[utoipa::path(
    post,
    path = "/api/v1/profiles/{id}/comments/{comment_id}/like",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "New like count", body = LikeResponse),
        (status = 404, description = "Comment not found under this post", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn like_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let likes_count = state
        .db
        .profiles()
        .like_comment(&post_id, &comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(Json(LikeResponse {
        ok: true,
        likes_count,
    }))
}

/// Check the password for a comment and obtain a grant
///
/// POST /api/v1/profiles/{id}/comments/{comment_id}/verify
#[utoipa::path(
    post,
    path = "/api/v1/profiles/{id}/comments/{comment_id}/verify",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    request_body = CredentialFields,
    responses(
        (status = 200, description = "Verified", body = VerifyResponse),
        (status = 400, description = "Password too short or wrong post", body = ApiErrorResponse),
        (status = 401, description = "Wrong password", body = ApiErrorResponse),
        (status = 404, description = "Comment not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn verify_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    AppJson(auth): AppJson<CredentialFields>,
) -> ApiResult<Json<VerifyResponse>> {
    let target = ResourceRef::new(ResourceKind::ProfileComment, &comment_id).under(&post_id);
    Ok(Json(ownership::verify(&state, target, &auth).await?))
}

/// List replies under a comment, oldest first
///
/// GET /api/v1/profiles/{id}/comments/{comment_id}/replies
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}/comments/{comment_id}/replies",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Replies", body = CommentReplyListResponse)
    ),
    tag = "comments"
)]
pub async fn list_replies(
    State(state): State<AppState>,
    Path((_post_id, comment_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let replies = state.db.profiles().list_replies(&comment_id).await?;
    Ok(Json(CommentReplyListResponse {
        replies: replies.into_iter().map(CommentReplyResponse::from).collect(),
    }))
}

/// Reply to a comment
///
/// POST /api/v1/profiles/{id}/comments/{comment_id}/replies
#[utoipa::path(
    post,
    path = "/api/v1/profiles/{id}/comments/{comment_id}/replies",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Reply created", body = CommentReplyEnvelope),
        (status = 400, description = "Missing field, short password or wrong post", body = ApiErrorResponse),
        (status = 404, description = "Comment not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn create_reply(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(String, String)>,
    AppJson(body): AppJson<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = required(&body.name, "name is required")?;
    let content = required(&body.content, "content is required")?;
    ensure_comment_under_post(&state, &post_id, &comment_id).await?;
    let ownership = ownership::claim_new(&state, &body.auth).await?;

    let reply = state
        .db
        .profiles()
        .create_reply(
            &comment_id,
            NewCommentReply {
                name,
                avatar: optional(body.avatar.as_deref())
                    .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
                content,
                image_urls: body.image_urls,
                ownership,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("profile_comment not found".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CommentReplyEnvelope {
            reply: reply.into(),
        }),
    ))
}

/// Edit a reply under a comment
///
/// PATCH /api/v1/profiles/{id}/comments/{comment_id}/replies/{reply_id}
#[utoipa::path(
    patch,
    path = "/api/v1/profiles/{id}/comments/{comment_id}/replies/{reply_id}",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Reply updated", body = CommentReplyEnvelope),
        (status = 400, description = "Reply belongs elsewhere", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Reply not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn update_reply(
    State(state): State<AppState>,
    Path((post_id, comment_id, reply_id)): Path<(String, String, String)>,
    AppJson(body): AppJson<UpdateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = required(&body.content, "content is required")?;
    ensure_comment_under_post(&state, &post_id, &comment_id).await?;
    let target = ResourceRef::new(ResourceKind::CommentReply, &reply_id).under(&comment_id);
    ownership::authorize_mutation(&state, target, &body.auth).await?;

    let reply = state
        .db
        .profiles()
        .update_reply(&reply_id, &content, body.image_urls.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("comment_reply not found".to_string()))?;

    Ok(Json(CommentReplyEnvelope {
        reply: reply.into(),
    }))
}

/// Delete a reply under a comment
///
/// DELETE /api/v1/profiles/{id}/comments/{comment_id}/replies/{reply_id}
#[utoipa::path(
    delete,
    path = "/api/v1/profiles/{id}/comments/{comment_id}/replies/{reply_id}",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    request_body = CredentialFields,
    responses(
        (status = 200, description = "Reply deleted", body = OkResponse),
        (status = 400, description = "Reply belongs elsewhere", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Reply not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn delete_reply(
    State(state): State<AppState>,
    Path((post_id, comment_id, reply_id)): Path<(String, String, String)>,
    DeleteCredentials(auth): DeleteCredentials,
) -> ApiResult<impl IntoResponse> {
    ensure_comment_under_post(&state, &post_id, &comment_id).await?;
    let target = ResourceRef::new(ResourceKind::CommentReply, &reply_id).under(&comment_id);
    let reason = ownership::authorize_mutation(&state, target, &auth).await?;

    let images = state
        .db
        .profiles()
        .delete_reply(&reply_id)
        .await?
        .unwrap_or_default();
    info!(id = %reply_id, comment = %comment_id, ?reason, "Profile comment reply deleted");

    remove_images(&state, &images).await;
    Ok(Json(OkResponse::ok()))
}

/// Check the password for a comment reply and obtain a grant
///
/// POST /api/v1/profiles/{id}/comments/{comment_id}/replies/{reply_id}/verify
#[utoipa::path(
    post,
    path = "/api/v1/profiles/{id}/comments/{comment_id}/replies/{reply_id}/verify",
    params(
        ("id" = String, Path, description = "Post id"),
        ("comment_id" = String, Path, description = "Comment id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    request_body = CredentialFields,
    responses(
        (status = 200, description = "Verified", body = VerifyResponse),
        (status = 400, description = "Password too short or wrong comment", body = ApiErrorResponse),
        (status = 401, description = "Wrong password", body = ApiErrorResponse),
        (status = 404, description = "Reply not found", body = ApiErrorResponse)
    ),
    tag = "comments"
)]
pub async fn verify_reply(
    State(state): State<AppState>,
    Path((_post_id, comment_id, reply_id)): Path<(String, String, String)>,
    AppJson(auth): AppJson<CredentialFields>,
) -> ApiResult<Json<VerifyResponse>> {
    let target = ResourceRef::new(ResourceKind::CommentReply, &reply_id).under(&comment_id);
    Ok(Json(ownership::verify(&state, target, &auth).await?))
}
