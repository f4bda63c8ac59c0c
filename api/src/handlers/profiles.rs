use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use authz::DenyReason;
use database::NewPost;
use tracing::warn;

use super::required;
use crate::{
    error::{ApiError, ApiErrorResponse, ApiResult},
    extract::AppJson,
    models::{CreatePostRequest, PostEnvelope, PostListResponse, PostResponse},
    AppState,
};

/// List profile posts, newest first
///
/// GET /api/v1/profiles
#[utoipa::path(
    get,
    path = "/api/v1/profiles",
    responses(
        (status = 200, description = "All posts with comment counts", body = PostListResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "profiles"
)]
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let posts = state.db.profiles().list_posts().await?;
    Ok(Json(PostListResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
    }))
}

/// Create a profile post (admin only)
///
/// POST /api/v1/profiles
#[utoipa::path(
    post,
    path = "/api/v1/profiles",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostEnvelope),
        (status = 400, description = "Missing title", body = ApiErrorResponse),
        (status = 401, description = "Admin key missing or wrong", body = ApiErrorResponse)
    ),
    tag = "profiles"
)]
pub async fn create_post(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.guard.is_admin(body.admin_key.as_deref()) {
        warn!("Profile post creation refused: not an admin");
        return Err(DenyReason::Unauthorized.into());
    }
    let title = required(&body.title, "title is required")?;

    let post = state
        .db
        .profiles()
        .create_post(NewPost {
            title,
            role: body.role.trim().to_string(),
            bio: body.bio.trim().to_string(),
            cover_url: body.cover_url.trim().to_string(),
            image_urls: body.image_urls,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PostEnvelope { post: post.into() })))
}

/// Fetch one profile post
///
/// GET /api/v1/profiles/{id}
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{id}",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = PostEnvelope),
        (status = 404, description = "Post not found", body = ApiErrorResponse)
    ),
    tag = "profiles"
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let post = state
        .db
        .profiles()
        .get_post(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("profile_post not found".to_string()))?;

    Ok(Json(PostEnvelope { post: post.into() }))
}
