//! Glue between handlers and the ownership guard.
//!
//! Store lookups stay on the async runtime; anything that may run argon2 is
//! moved to the blocking pool (verify does this inside `authz`).

use authz::{AllowReason, NewOwnership, ResourceRef};

use crate::{
    error::{ApiError, ApiResult},
    models::{CredentialFields, GrantResponse, VerifyResponse},
    AppState,
};

/// Ownership facts for a record about to be created
pub async fn claim_new(state: &AppState, auth: &CredentialFields) -> ApiResult<NewOwnership> {
    let guard = state.guard.clone();
    let credentials = auth.credentials();
    let ownership = tokio::task::spawn_blocking(move || guard.claim_new(&credentials)).await??;
    Ok(ownership)
}

/// Look up `target`, check its parent and run the mutation predicate
pub async fn authorize_mutation(
    state: &AppState,
    target: ResourceRef,
    auth: &CredentialFields,
) -> ApiResult<AllowReason> {
    let resource = state
        .db
        .find_owned(target.kind, &target.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", target.kind)))?;

    let guard = state.guard.clone();
    let credentials = auth.credentials();
    let grant = auth.grant.clone();
    let decision = tokio::task::spawn_blocking(move || {
        guard.authorize(&target, &resource, &credentials, grant.as_deref())
    })
    .await?;

    Ok(decision.into_result()?)
}

/// Verify ownership of `target` and hand back a grant on success
pub async fn verify(
    state: &AppState,
    target: ResourceRef,
    auth: &CredentialFields,
) -> ApiResult<VerifyResponse> {
    let outcome = state
        .guard
        .verify(state.db.as_ref(), &target, &auth.credentials())
        .await?;

    outcome.decision.into_result()?;
    Ok(VerifyResponse {
        ok: true,
        grant: outcome.grant.map(GrantResponse::from),
    })
}
