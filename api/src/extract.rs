use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};

use crate::{error::ApiError, models::CredentialFields};

/// `Json` whose rejections come back in the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Credentials sent with a DELETE. An empty body means no credentials, so
/// the request is judged by the ownership check instead of failing to parse.
#[derive(Debug, Default)]
pub struct DeleteCredentials(pub CredentialFields);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for DeleteCredentials {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read body: {}", e.body_text())))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))
    }
}
