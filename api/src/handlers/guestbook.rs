use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use authz::{ResourceKind, ResourceRef};
use database::{NewEntry, NewReply, SortOrder, DEFAULT_PAGE_SIZE};
use tracing::info;

use super::{optional, required, DEFAULT_AVATAR};
use crate::{
    error::{ApiError, ApiErrorResponse, ApiResult},
    extract::{AppJson, DeleteCredentials},
    models::{
        CreateEntryRequest, CreateReplyRequest, CredentialFields, EntryEnvelope,
        EntryPageResponse, ListEntriesParams, OkResponse, ReplyEnvelope, UpdateContentRequest,
        VerifyResponse,
    },
    ownership, AppState,
};

/// List guestbook entries with their replies
///
/// GET /api/v1/guestbook
#[utoipa::path(
    get,
    path = "/api/v1/guestbook",
    params(ListEntriesParams),
    responses(
        (status = 200, description = "One page of entries", body = EntryPageResponse),
        (status = 500, description = "Internal server error", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<ListEntriesParams>,
) -> ApiResult<impl IntoResponse> {
    let sort = SortOrder::parse(params.sort.as_deref());
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let page = state.db.guestbook().list_entries(sort, page, limit).await?;
    Ok(Json(EntryPageResponse::from(page)))
}

/// Create a guestbook entry
///
/// POST /api/v1/guestbook
#[utoipa::path(
    post,
    path = "/api/v1/guestbook",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = EntryEnvelope),
        (status = 400, description = "Missing field or password too short", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateEntryRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = required(&body.name, "name is required")?;
    let content = required(&body.content, "content is required")?;
    let ownership = ownership::claim_new(&state, &body.auth).await?;

    let entry = state
        .db
        .guestbook()
        .create_entry(NewEntry {
            name,
            avatar: optional(body.avatar.as_deref()).unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            content,
            image_url: optional(body.image_url.as_deref()),
            ownership,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(EntryEnvelope { entry: entry.into() })))
}

/// Edit an entry's content
///
/// PUT /api/v1/guestbook/{id}
#[utoipa::path(
    put,
    path = "/api/v1/guestbook/{id}",
    params(("id" = String, Path, description = "Entry id")),
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Entry updated", body = EntryEnvelope),
        (status = 401, description = "Wrong or missing password", body = ApiErrorResponse),
        (status = 404, description = "Entry not found", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateContentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = required(&body.content, "content is required")?;
    let target = ResourceRef::new(ResourceKind::GuestbookEntry, &id);
    ownership::authorize_mutation(&state, target, &body.auth).await?;

    let entry = state
        .db
        .guestbook()
        .update_entry(&id, &content)
        .await?
        .ok_or_else(|| ApiError::NotFound("guestbook_entry not found".to_string()))?;

    Ok(Json(EntryEnvelope { entry: entry.into() }))
}

/// Delete an entry and its replies
///
/// DELETE /api/v1/guestbook/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/guestbook/{id}",
    params(("id" = String, Path, description = "Entry id")),
    request_body = CredentialFields,
    responses(
        (status = 200, description = "Entry deleted", body = OkResponse),
        (status = 401, description = "Wrong or missing password", body = ApiErrorResponse),
        (status = 404, description = "Entry not found", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    DeleteCredentials(auth): DeleteCredentials,
) -> ApiResult<impl IntoResponse> {
    let target = ResourceRef::new(ResourceKind::GuestbookEntry, &id);
    let reason = ownership::authorize_mutation(&state, target, &auth).await?;

    state.db.guestbook().delete_entry(&id).await?;
    info!(id = %id, ?reason, "Guestbook entry deleted");

    Ok(Json(OkResponse::ok()))
}

/// Reply to an entry
///
/// POST /api/v1/guestbook/{id}/replies
#[utoipa::path(
    post,
    path = "/api/v1/guestbook/{id}/replies",
    params(("id" = String, Path, description = "Entry id")),
    request_body = CreateReplyRequest,
    responses(
        (status = 201, description = "Reply created", body = ReplyEnvelope),
        (status = 400, description = "Missing field or password too short", body = ApiErrorResponse),
        (status = 404, description = "Entry not found", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn create_reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<CreateReplyRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = required(&body.content, "content is required")?;
    let name = required(&body.name, "name is required")?;
    let ownership = ownership::claim_new(&state, &body.auth).await?;

    let reply = state
        .db
        .guestbook()
        .create_reply(
            &id,
            NewReply {
                name,
                content,
                image_url: optional(body.image_url.as_deref()),
                ownership,
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("guestbook_entry not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(ReplyEnvelope { reply: reply.into() })))
}

/// Edit a reply
///
/// PUT /api/v1/guestbook/{id}/replies/{reply_id}
#[utoipa::path(
    put,
    path = "/api/v1/guestbook/{id}/replies/{reply_id}",
    params(
        ("id" = String, Path, description = "Entry id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Reply updated", body = ReplyEnvelope),
        (status = 400, description = "Reply belongs to another entry", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Reply not found", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn update_reply(
    State(state): State<AppState>,
    Path((id, reply_id)): Path<(String, String)>,
    AppJson(body): AppJson<UpdateContentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = required(&body.content, "content is required")?;
    let target = ResourceRef::new(ResourceKind::GuestbookReply, &reply_id).under(&id);
    ownership::authorize_mutation(&state, target, &body.auth).await?;

    let reply = state
        .db
        .guestbook()
        .update_reply(&reply_id, &content)
        .await?
        .ok_or_else(|| ApiError::NotFound("guestbook_reply not found".to_string()))?;

    Ok(Json(ReplyEnvelope { reply: reply.into() }))
}

/// Delete a reply
///
/// DELETE /api/v1/guestbook/{id}/replies/{reply_id}
#[utoipa::path(
    delete,
    path = "/api/v1/guestbook/{id}/replies/{reply_id}",
    params(
        ("id" = String, Path, description = "Entry id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    request_body = CredentialFields,
    responses(
        (status = 200, description = "Reply deleted", body = OkResponse),
        (status = 400, description = "Reply belongs to another entry", body = ApiErrorResponse),
        (status = 401, description = "Not the owner", body = ApiErrorResponse),
        (status = 404, description = "Reply not found", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn delete_reply(
    State(state): State<AppState>,
    Path((id, reply_id)): Path<(String, String)>,
    DeleteCredentials(auth): DeleteCredentials,
) -> ApiResult<impl IntoResponse> {
    let target = ResourceRef::new(ResourceKind::GuestbookReply, &reply_id).under(&id);
    let reason = ownership::authorize_mutation(&state, target, &auth).await?;

    state.db.guestbook().delete_reply(&reply_id).await?;
    info!(id = %reply_id, entry = %id, ?reason, "Guestbook reply deleted");

    Ok(Json(OkResponse::ok()))
}

/// Check the password for a reply and obtain a grant
///
/// POST /api/v1/guestbook/{id}/replies/{reply_id}/verify
#[utoipa::path(
    post,
    path = "/api/v1/guestbook/{id}/replies/{reply_id}/verify",
    params(
        ("id" = String, Path, description = "Entry id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    request_body = CredentialFields,
    responses(
        (status = 200, description = "Verified", body = VerifyResponse),
        (status = 400, description = "Password too short or wrong entry", body = ApiErrorResponse),
        (status = 401, description = "Wrong password", body = ApiErrorResponse),
        (status = 404, description = "Reply not found", body = ApiErrorResponse)
    ),
    tag = "guestbook"
)]
pub async fn verify_reply(
    State(state): State<AppState>,
    Path((id, reply_id)): Path<(String, String)>,
    AppJson(auth): AppJson<CredentialFields>,
) -> ApiResult<Json<VerifyResponse>> {
    let target = ResourceRef::new(ResourceKind::GuestbookReply, &reply_id).under(&id);
    Ok(Json(ownership::verify(&state, target, &auth).await?))
}
