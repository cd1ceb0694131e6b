//! Convergence cycle
//!
//! One cycle is a pure function of the identity key and current cluster
//! state: resolve the identity, validate its identifiers, converge the
//! dependent bindings and grants, and report an outcome the caller maps to
//! a requeue decision. The cycle holds no state between invocations.

use crate::sync::bindings::sync_service_accounts;
use crate::sync::config::ControllerConfig;
use crate::sync::grants::sync_role_assignments;
use crate::sync::restart::restart_deployments;
use crate::sync::schema::resolve_identity;
use crate::sync::store::ObjectStore;
use crate::sync::types::{IdentityKey, Result};
use tracing::{error, info};

/// Terminal classification of one convergence cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Identity exists under no known schema variant; wait for a new event
    IdentityGone,
    /// Identity exists but its client or principal ID is not set yet
    Unprovisioned,
    /// Identity's display name does not follow the naming convention
    InvalidName,
    /// Dependents converged; `changed` reports whether anything was written
    Converged { changed: bool },
}

/// Run one convergence cycle for `key`.
///
/// Fatal store errors on the core write paths propagate as `Err`; the
/// caller requeues with backoff and surfaces the error. Everything else is
/// classified into a `CycleOutcome`.
pub async fn run_cycle(
    store: &dyn ObjectStore,
    config: &ControllerConfig,
    key: &IdentityKey,
) -> Result<CycleOutcome> {
    let Some(identity) = resolve_identity(store, key).await? else {
        info!(identity = %key, "UserAssignedIdentity not found under any known API group");
        return Ok(CycleOutcome::IdentityGone);
    };

    info!(
        identity = %key,
        client_id = identity.client_id.as_deref().unwrap_or(""),
        principal_id = identity.principal_id.as_deref().unwrap_or(""),
        app_name = %identity.app_name,
        variant = %identity.variant,
        "Fetched UserAssignedIdentity"
    );

    let (Some(client_id), Some(principal_id)) = (&identity.client_id, &identity.principal_id)
    else {
        info!(identity = %key, "Missing critical ID information, skipping update");
        return Ok(CycleOutcome::Unprovisioned);
    };

    if identity.app_name.is_empty() {
        error!(identity = %key, "Cannot extract app name from identity display name");
        return Ok(CycleOutcome::InvalidName);
    }

    let binding_changes =
        sync_service_accounts(store, config, &identity.app_name, client_id).await?;
    for change in &binding_changes {
        restart_deployments(store, config, change).await;
    }

    let grants_changed = sync_role_assignments(store, &identity.app_name, principal_id).await?;

    Ok(CycleOutcome::Converged {
        changed: !binding_changes.is_empty() || grants_changed,
    })
}
