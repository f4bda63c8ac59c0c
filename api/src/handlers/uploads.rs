use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::info;

use crate::{
    error::{ApiError, ApiErrorResponse, ApiResult},
    models::{UploadForm, UploadResponse},
    AppState,
};

/// Upload an image
///
/// POST /api/v1/uploads
///
/// Multipart form with a `file` part and an optional `folder` text part.
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored; returns the public URL", body = UploadResponse),
        (status = 400, description = "Missing file, wrong type or too large", body = ApiErrorResponse)
    ),
    tag = "uploads"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut folder: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((content_type, data.to_vec()));
            }
            "folder" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read folder: {}", e)))?;
                folder = Some(text);
            }
            _ => {}
        }
    }

    let Some((content_type, data)) = file else {
        return Err(ApiError::BadRequest("file is required".to_string()));
    };

    let url = state
        .uploads
        .store_image(folder.as_deref(), &content_type, &data)
        .await?;
    info!(url = %url, size = data.len(), "Image uploaded");

    Ok(Json(UploadResponse { url }))
}
