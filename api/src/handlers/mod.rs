pub mod comments;
pub mod guestbook;
pub mod health;
pub mod profiles;
pub mod uploads;

use crate::error::{ApiError, ApiResult};

/// Trimmed value of a required text field
pub(crate) fn required(value: &str, message: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(message.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text; blank becomes `None`
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) const DEFAULT_AVATAR: &str = "🙂";
