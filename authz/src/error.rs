//! Error types for the ownership authorization system.
//!
//! # Security Note
//! Deny reasons are deliberately coarse. A caller learns whether a credential
//! was missing, too short, or wrong, but never anything about the stored
//! digest or the configured admin key.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a mutation or verification was refused.
///
/// These are ordinary, recoverable outcomes of an authorization check and
/// map one-to-one onto the error kinds exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The credential was missing, did not match, or the resource cannot be
    /// claimed by a non-admin.
    #[error("Invalid or missing credential")]
    Unauthorized,

    /// The resource does not exist.
    #[error("Resource not found")]
    NotFound,

    /// The resource exists but not under the parent named in the request.
    #[error("Resource does not belong to the requested parent")]
    BadRequest,

    /// The supplied password is below the minimum length.
    #[error("Password must be at least {} characters", crate::password::MIN_PASSWORD_LEN)]
    TooShort,
}

impl DenyReason {
    /// The stable error-kind string handed to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            DenyReason::Unauthorized => "unauthorized",
            DenyReason::NotFound => "not_found",
            DenyReason::BadRequest => "bad_request",
            DenyReason::TooShort => "too_short",
        }
    }
}

/// Errors that can occur while running authorization operations.
///
/// Everything except [`AuthzError::Denied`] indicates an infrastructure
/// problem rather than a refused request.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The request was refused.
    #[error("{0}")]
    Denied(#[from] DenyReason),

    /// Producing a digest for a new secret failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// The resource store could not be queried.
    #[error("Resource lookup failed: {0}")]
    Lookup(String),

    /// The blocking password comparison did not complete.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl AuthzError {
    /// Returns the deny reason when this error is a refused request.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AuthzError::Denied(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
