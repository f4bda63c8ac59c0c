//! Core types for ownership authorization.
//!
//! A request is decided from three inputs: the stored ownership facts of the
//! resource ([`OwnedResource`]), what the requester presented
//! ([`Credentials`]), and whether the requester holds a verification grant for
//! that resource.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DenyReason;
use crate::password::CredentialHash;

/// The kinds of user-generated records that carry an owner secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Top-level guestbook entry.
    GuestbookEntry,
    /// Reply under a guestbook entry.
    GuestbookReply,
    /// Comment under a profile post.
    ProfileComment,
    /// Reply under a profile comment.
    CommentReply,
}

impl ResourceKind {
    /// Stable name used in grants and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::GuestbookEntry => "guestbook_entry",
            ResourceKind::GuestbookReply => "guestbook_reply",
            ResourceKind::ProfileComment => "profile_comment",
            ResourceKind::CommentReply => "comment_reply",
        }
    }

    /// Parses the name produced by [`ResourceKind::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "guestbook_entry" => Some(ResourceKind::GuestbookEntry),
            "guestbook_reply" => Some(ResourceKind::GuestbookReply),
            "profile_comment" => Some(ResourceKind::ProfileComment),
            "comment_reply" => Some(ResourceKind::CommentReply),
            _ => None,
        }
    }

    /// Whether a verification grant may stand in for the password when
    /// editing or deleting this kind. True exactly for the kinds that have a
    /// verify endpoint.
    pub fn accepts_verification_grant(&self) -> bool {
        !matches!(self, ResourceKind::GuestbookEntry)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership facts of a stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedResource {
    pub kind: ResourceKind,
    pub id: String,
    /// Containing resource; `None` for top-level guestbook entries.
    pub parent_id: Option<String>,
    /// Digest of the creator's password. `None` only for admin-created
    /// records without a password.
    pub owner_secret_hash: Option<CredentialHash>,
    pub created_by_admin: bool,
}

/// Identifies the resource a request is aimed at, as implied by its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    /// The parent named in the request path, if the route has one.
    pub expected_parent: Option<String>,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            expected_parent: None,
        }
    }

    pub fn under(mut self, parent_id: impl Into<String>) -> Self {
        self.expected_parent = Some(parent_id.into());
        self
    }

    /// Checks that `resource` is the one this reference names, under the
    /// expected parent.
    pub fn check_parent(&self, resource: &OwnedResource) -> Result<(), DenyReason> {
        match &self.expected_parent {
            Some(expected) if resource.parent_id.as_deref() != Some(expected.as_str()) => {
                Err(DenyReason::BadRequest)
            }
            _ => Ok(()),
        }
    }
}

/// Credentials presented with a request.
///
/// Both fields are trimmed on construction and empty values become `None`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    admin_key: Option<String>,
    password: Option<String>,
}

impl Credentials {
    pub fn new(admin_key: Option<&str>, password: Option<&str>) -> Self {
        Self {
            admin_key: normalize(admin_key),
            password: normalize(password),
        }
    }

    pub fn password(password: &str) -> Self {
        Self::new(None, Some(password))
    }

    pub fn admin(admin_key: &str) -> Self {
        Self::new(Some(admin_key), None)
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn admin_key(&self) -> Option<&str> {
        self.admin_key.as_deref()
    }

    pub fn supplied_password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("admin_key", &self.admin_key.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Why a request was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    Admin,
    Password,
    Grant,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowReason),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Deny(reason) => Some(*reason),
            Decision::Allow(_) => None,
        }
    }

    pub fn into_result(self) -> Result<AllowReason, DenyReason> {
        match self {
            Decision::Allow(reason) => Ok(reason),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Ownership facts to store with a newly created resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOwnership {
    pub secret_hash: Option<CredentialHash>,
    pub created_by_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(parent: &str) -> OwnedResource {
        OwnedResource {
            kind: ResourceKind::GuestbookReply,
            id: "r1".into(),
            parent_id: Some(parent.into()),
            owner_secret_hash: None,
            created_by_admin: false,
        }
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            ResourceKind::GuestbookEntry,
            ResourceKind::GuestbookReply,
            ResourceKind::ProfileComment,
            ResourceKind::CommentReply,
        ] {
            assert_eq!(ResourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::parse("profile_post"), None);
    }

    #[test]
    fn test_grant_acceptance_by_kind() {
        assert!(!ResourceKind::GuestbookEntry.accepts_verification_grant());
        assert!(ResourceKind::GuestbookReply.accepts_verification_grant());
        assert!(ResourceKind::ProfileComment.accepts_verification_grant());
        assert!(ResourceKind::CommentReply.accepts_verification_grant());
    }

    #[test]
    fn test_parent_check() {
        let target = ResourceRef::new(ResourceKind::GuestbookReply, "r1").under("e1");
        assert!(target.check_parent(&reply("e1")).is_ok());
        assert_eq!(target.check_parent(&reply("e2")), Err(DenyReason::BadRequest));

        let unscoped = ResourceRef::new(ResourceKind::GuestbookReply, "r1");
        assert!(unscoped.check_parent(&reply("e2")).is_ok());
    }

    #[test]
    fn test_credentials_normalized() {
        let creds = Credentials::new(Some("  key "), Some("   "));
        assert_eq!(creds.admin_key(), Some("key"));
        assert_eq!(creds.supplied_password(), None);

        let creds = Credentials::password(" secret1 ");
        assert_eq!(creds.supplied_password(), Some("secret1"));
        assert_eq!(creds.admin_key(), None);
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let debug = format!("{:?}", Credentials::new(Some("key"), Some("secret1")));
        assert!(!debug.contains("secret1"));
        assert!(!debug.contains("\"key\""));
    }

    #[test]
    fn test_decision_helpers() {
        let allow = Decision::Allow(AllowReason::Admin);
        assert!(allow.is_allowed());
        assert_eq!(allow.into_result(), Ok(AllowReason::Admin));

        let deny = Decision::Deny(DenyReason::TooShort);
        assert!(!deny.is_allowed());
        assert_eq!(deny.deny_reason(), Some(DenyReason::TooShort));
    }
}
