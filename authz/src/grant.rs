//! Verification grants.
//!
//! A successful verify call hands the client a short-lived token proving it
//! knew the password of one resource. The server keeps no record of issued
//! grants: a grant is a keyed BLAKE3 MAC over `(kind, id, expiry)`, so any
//! process holding the same key can check it. Grants cannot be revoked; they
//! lapse at expiry or when the key changes.
//!
//! [`GrantStore`] is the client half: an in-memory map from resource to
//! grant that lives exactly as long as the client process.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ResourceKind;

const KEY_CONTEXT: &str = "guestbook 2024 verification grant key";

/// A signed, expiring proof of ownership for a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks verification grants.
#[derive(Clone)]
pub struct GrantSigner {
    key: [u8; 32],
    ttl: Duration,
}

impl GrantSigner {
    pub fn new(key: [u8; 32], ttl: Duration) -> Self {
        Self { key, ttl }
    }

    /// Derives the signing key from a configured secret, so grants survive
    /// restarts and are shared between processes using the same secret.
    pub fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self::new(blake3::derive_key(KEY_CONTEXT, secret.as_bytes()), ttl)
    }

    /// Uses a fresh random key. Grants die with the process.
    pub fn random(ttl: Duration) -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self::new(key, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, kind: ResourceKind, id: &str) -> VerificationGrant {
        self.issue_at(kind, id, Utc::now())
    }

    pub fn issue_at(&self, kind: ResourceKind, id: &str, now: DateTime<Utc>) -> VerificationGrant {
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = now.timestamp().saturating_add(ttl_secs);
        // An unrepresentable expiry yields a grant that is already stale.
        let expires_at = DateTime::<Utc>::from_timestamp(expires, 0).unwrap_or(now);

        let payload = format!("{}:{}:{}", kind.as_str(), expires_at.timestamp(), id);
        let tag = blake3::keyed_hash(&self.key, payload.as_bytes());
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(tag.as_bytes())
        );

        VerificationGrant { token, expires_at }
    }

    pub fn validate(&self, token: &str, kind: ResourceKind, id: &str) -> bool {
        self.validate_at(token, kind, id, Utc::now())
    }

    /// True iff `token` was issued by this key for exactly `(kind, id)` and
    /// has not expired at `now`.
    pub fn validate_at(&self, token: &str, kind: ResourceKind, id: &str, now: DateTime<Utc>) -> bool {
        let Some((payload_b64, tag_b64)) = token.trim().split_once('.') else {
            return false;
        };
        let (Ok(payload), Ok(tag)) = (
            URL_SAFE_NO_PAD.decode(payload_b64),
            URL_SAFE_NO_PAD.decode(tag_b64),
        ) else {
            return false;
        };
        let Ok(tag) = <[u8; 32]>::try_from(tag.as_slice()) else {
            return false;
        };

        // blake3::Hash equality is constant time.
        if blake3::keyed_hash(&self.key, &payload) != blake3::Hash::from(tag) {
            debug!("Rejected verification grant with bad signature");
            return false;
        }

        let Ok(payload) = std::str::from_utf8(&payload) else {
            return false;
        };
        let mut parts = payload.splitn(3, ':');
        let (Some(grant_kind), Some(expires), Some(grant_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let Ok(expires) = expires.parse::<i64>() else {
            return false;
        };

        ResourceKind::parse(grant_kind) == Some(kind) && grant_id == id && now.timestamp() < expires
    }
}

impl fmt::Debug for GrantSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Client-held verification grants for the current session.
///
/// The server keeps no record of issued grants. A Rust client of the HTTP
/// API (a front end or a scripted caller) stores the `grant` returned by a
/// verify call here and sends it back with later edits and deletes of the
/// same record. Expired grants are ignored on lookup.
#[derive(Debug, Default)]
pub struct GrantStore {
    grants: HashMap<(ResourceKind, String), VerificationGrant>,
}

impl GrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, kind: ResourceKind, id: impl Into<String>, grant: VerificationGrant) {
        self.grants.insert((kind, id.into()), grant);
    }

    /// The grant for a resource, unless it has expired.
    pub fn grant_for(&self, kind: ResourceKind, id: &str) -> Option<&VerificationGrant> {
        let now = Utc::now();
        self.grants
            .get(&(kind, id.to_string()))
            .filter(|grant| grant.expires_at > now)
    }

    pub fn is_verified(&self, kind: ResourceKind, id: &str) -> bool {
        self.grant_for(kind, id).is_some()
    }

    pub fn forget(&mut self, kind: ResourceKind, id: &str) -> Option<VerificationGrant> {
        self.grants.remove(&(kind, id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
