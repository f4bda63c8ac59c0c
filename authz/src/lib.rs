//! Password-ownership authorization for guestbook records.
//!
//! Every guestbook entry, reply and profile comment is owned by whoever knows
//! the password it was created with. A single process-wide admin key
//! overrides ownership. This crate decides, for one request against one
//! record, whether the requester may edit or delete it.
//!
//! # Decision flow
//!
//! 1. **Admin key** matches → allow, whatever the record holds
//! 2. **No stored digest** → deny (only an admin can touch it)
//! 3. **Password too short** → deny before any hashing
//! 4. **Password matches** the stored digest → allow
//! 5. **Verification grant** for this record (reply/comment kinds only) → allow
//! 6. Otherwise → deny
//!
//! The pure predicate is [`authorize_mutation`]. [`OwnershipGuard`] bundles
//! it with the configured admin key, the hasher and the grant signer, and adds
//! the verify operation used to pre-authorize a client for a record.
//!
//! # Example
//!
//! ```rust
//! use authz::{AdminKey, Argon2Hasher, Credentials, GrantSigner, OwnershipGuard};
//! use authz::types::{OwnedResource, ResourceKind};
//! use std::time::Duration;
//!
//! let guard = OwnershipGuard::new(
//!     AdminKey::new("admin-secret"),
//!     Argon2Hasher::fast_insecure(),
//!     GrantSigner::random(Duration::from_secs(60)),
//! );
//!
//! let ownership = guard.claim_new(&Credentials::password("secret1")).unwrap();
//! let entry = OwnedResource {
//!     kind: ResourceKind::GuestbookEntry,
//!     id: "e1".into(),
//!     parent_id: None,
//!     owner_secret_hash: ownership.secret_hash,
//!     created_by_admin: ownership.created_by_admin,
//! };
//!
//! assert!(guard.can_mutate(&entry, &Credentials::password("secret1"), None).is_allowed());
//! assert!(!guard.can_mutate(&entry, &Credentials::password("wrong!!"), None).is_allowed());
//! assert!(guard.can_mutate(&entry, &Credentials::admin("admin-secret"), None).is_allowed());
//! ```

pub mod admin;
pub mod error;
pub mod grant;
pub mod password;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use admin::AdminKey;
pub use error::{AuthzError, DenyReason, Result};
pub use grant::{GrantSigner, GrantStore, VerificationGrant};
pub use password::{Argon2Hasher, CredentialHash, CredentialHasher, MIN_PASSWORD_LEN};
pub use types::{
    AllowReason, Credentials, Decision, NewOwnership, OwnedResource, ResourceKind, ResourceRef,
};

use password::check_password_length;

/// Point lookup of a record's ownership facts.
///
/// Implemented by the data store. `Ok(None)` means the record does not exist.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    async fn find_resource(&self, kind: ResourceKind, id: &str) -> Result<Option<OwnedResource>>;
}

/// Decides whether an edit or delete of `resource` may proceed.
///
/// `verified` says the requester holds a valid verification grant for this
/// exact record; it only counts for kinds that accept grants. This function
/// has no side effects and invokes the hasher at most once.
pub fn authorize_mutation<H: CredentialHasher + ?Sized>(
    admin: &AdminKey,
    hasher: &H,
    resource: &OwnedResource,
    credentials: &Credentials,
    verified: bool,
) -> Decision {
    if admin.is_admin(credentials.admin_key()) {
        return Decision::Allow(AllowReason::Admin);
    }

    let Some(digest) = &resource.owner_secret_hash else {
        return Decision::Deny(DenyReason::Unauthorized);
    };

    if let Some(password) = credentials.supplied_password() {
        if let Err(reason) = check_password_length(password) {
            return Decision::Deny(reason);
        }
        if hasher.verify(password, digest) {
            return Decision::Allow(AllowReason::Password);
        }
    }

    if verified && resource.kind.accepts_verification_grant() {
        return Decision::Allow(AllowReason::Grant);
    }

    Decision::Deny(DenyReason::Unauthorized)
}

/// Result of a verify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub decision: Decision,
    /// Present when a password check succeeded. Admins get no grant: their
    /// key already bypasses ownership.
    pub grant: Option<VerificationGrant>,
}

impl Verification {
    fn denied(reason: DenyReason) -> Self {
        Self {
            decision: Decision::Deny(reason),
            grant: None,
        }
    }
}

/// The configured ownership check: admin key, hasher and grant signer.
#[derive(Debug, Clone)]
pub struct OwnershipGuard<H = Argon2Hasher> {
    admin: AdminKey,
    hasher: Arc<H>,
    grants: GrantSigner,
}

impl<H: CredentialHasher> OwnershipGuard<H> {
    pub fn new(admin: AdminKey, hasher: H, grants: GrantSigner) -> Self {
        Self {
            admin,
            hasher: Arc::new(hasher),
            grants,
        }
    }

    pub fn admin_key(&self) -> &AdminKey {
        &self.admin
    }

    pub fn hasher(&self) -> &H {
        self.hasher.as_ref()
    }

    pub fn grant_signer(&self) -> &GrantSigner {
        &self.grants
    }

    pub fn is_admin(&self, supplied: Option<&str>) -> bool {
        self.admin.is_admin(supplied)
    }

    /// Computes the ownership facts for a record about to be created.
    ///
    /// Non-admins must supply a password of at least [`MIN_PASSWORD_LEN`]
    /// characters. Admins may omit it, in which case no digest is stored and
    /// only an admin can later change the record.
    pub fn claim_new(&self, credentials: &Credentials) -> Result<NewOwnership> {
        let created_by_admin = self.admin.is_admin(credentials.admin_key());

        let secret_hash = match credentials.supplied_password() {
            Some(password) => {
                check_password_length(password)?;
                Some(self.hasher.hash(password)?)
            }
            None if created_by_admin => None,
            None => return Err(DenyReason::TooShort.into()),
        };

        Ok(NewOwnership {
            secret_hash,
            created_by_admin,
        })
    }

    /// Ownership check for an edit or delete, with an optional grant token.
    pub fn can_mutate(
        &self,
        resource: &OwnedResource,
        credentials: &Credentials,
        grant: Option<&str>,
    ) -> Decision {
        let verified = grant.is_some_and(|token| {
            resource.kind.accepts_verification_grant()
                && self.grants.validate(token, resource.kind, &resource.id)
        });

        let decision =
            authorize_mutation(&self.admin, self.hasher.as_ref(), resource, credentials, verified);
        log_decision("mutate", resource.kind, &resource.id, &decision);
        decision
    }

    /// Parent check followed by [`OwnershipGuard::can_mutate`].
    pub fn authorize(
        &self,
        target: &ResourceRef,
        resource: &OwnedResource,
        credentials: &Credentials,
        grant: Option<&str>,
    ) -> Decision {
        if let Err(reason) = target.check_parent(resource) {
            let decision = Decision::Deny(reason);
            log_decision("mutate", resource.kind, &resource.id, &decision);
            return decision;
        }
        self.can_mutate(resource, credentials, grant)
    }

    /// Verify against an already looked-up record.
    ///
    /// Checks run in a fixed order: admin key, password length, existence,
    /// parent, password match. `resource` is the lookup result for `target`.
    pub fn verify_resolved(
        &self,
        target: &ResourceRef,
        resource: Option<&OwnedResource>,
        credentials: &Credentials,
    ) -> Verification {
        let outcome = match self.verify_precheck(target, resource, credentials) {
            Precheck::Done(outcome) => outcome,
            Precheck::Compare {
                password,
                digest,
                resource,
            } => {
                let matched = self.hasher.verify(password, digest);
                self.verify_finish(resource, matched)
            }
        };
        log_decision("verify", target.kind, &target.id, &outcome.decision);
        outcome
    }

    /// Every verify step short of the password comparison.
    fn verify_precheck<'a>(
        &self,
        target: &ResourceRef,
        resource: Option<&'a OwnedResource>,
        credentials: &'a Credentials,
    ) -> Precheck<'a> {
        if self.admin.is_admin(credentials.admin_key()) {
            return Precheck::Done(Verification {
                decision: Decision::Allow(AllowReason::Admin),
                grant: None,
            });
        }

        let Some(password) = credentials.supplied_password() else {
            return Precheck::Done(Verification::denied(DenyReason::TooShort));
        };
        if let Err(reason) = check_password_length(password) {
            return Precheck::Done(Verification::denied(reason));
        }

        let Some(resource) = resource else {
            return Precheck::Done(Verification::denied(DenyReason::NotFound));
        };
        if let Err(reason) = target.check_parent(resource) {
            return Precheck::Done(Verification::denied(reason));
        }

        let Some(digest) = &resource.owner_secret_hash else {
            return Precheck::Done(Verification::denied(DenyReason::Unauthorized));
        };

        Precheck::Compare {
            password,
            digest,
            resource,
        }
    }

    fn verify_finish(&self, resource: &OwnedResource, matched: bool) -> Verification {
        if !matched {
            return Verification::denied(DenyReason::Unauthorized);
        }
        Verification {
            decision: Decision::Allow(AllowReason::Password),
            grant: Some(self.grants.issue(resource.kind, &resource.id)),
        }
    }

    /// Whether verifying with these credentials depends on the stored record.
    /// False when the admin key matches or the password fails the length
    /// rule; both outcomes are decided without a lookup.
    fn verify_needs_lookup(&self, credentials: &Credentials) -> bool {
        !self.admin.is_admin(credentials.admin_key())
            && credentials
                .supplied_password()
                .is_some_and(|password| check_password_length(password).is_ok())
    }
}

impl<H: CredentialHasher + 'static> OwnershipGuard<H> {
    /// Pre-checks ownership of a record so the client can remember the
    /// result. The store is only consulted when the admin key does not match
    /// and the password passes the length rule. The password comparison runs
    /// on the blocking pool.
    pub async fn verify<L: ResourceLookup + ?Sized>(
        &self,
        lookup: &L,
        target: &ResourceRef,
        credentials: &Credentials,
    ) -> Result<Verification> {
        let resource = if self.verify_needs_lookup(credentials) {
            debug!("Looking up {} {} for verification", target.kind, target.id);
            lookup.find_resource(target.kind, &target.id).await?
        } else {
            None
        };

        let outcome = match self.verify_precheck(target, resource.as_ref(), credentials) {
            Precheck::Done(outcome) => outcome,
            Precheck::Compare {
                password,
                digest,
                resource,
            } => {
                let hasher = Arc::clone(&self.hasher);
                let password = password.to_string();
                let digest = digest.clone();
                let matched =
                    tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
                        .await
                        .map_err(|e| AuthzError::Task(e.to_string()))?;
                self.verify_finish(resource, matched)
            }
        };
        log_decision("verify", target.kind, &target.id, &outcome.decision);
        Ok(outcome)
    }
}

/// Outcome of the verify steps that need no hashing.
enum Precheck<'a> {
    Done(Verification),
    Compare {
        password: &'a str,
        digest: &'a CredentialHash,
        resource: &'a OwnedResource,
    },
}

fn log_decision(operation: &str, kind: ResourceKind, id: &str, decision: &Decision) {
    match decision {
        Decision::Allow(reason) => {
            info!(operation, %kind, id, ?reason, "Ownership check allowed");
        }
        Decision::Deny(reason) => {
            warn!(operation, %kind, id, reason = reason.kind(), "Ownership check denied");
        }
    }
}
