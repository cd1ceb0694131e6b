//! RoleAssignment principal synchronization
//!
//! Grants are matched by label selector across every known schema variant
//! and scope, since an application's RoleAssignments may exist under more
//! than one representation at once. Each grant's principal reference is
//! written back through whichever field casing the object already uses.

use crate::sync::schema::{
    grant_ref, probe_field, resolve_grants, set_nested_str, PRINCIPAL_ID_FIELDS,
    SPEC_FOR_PROVIDER_PATH,
};
use crate::sync::store::ObjectStore;
use crate::sync::types::{Error, Result};
use tracing::{info, warn};

/// Converge every grant of the application onto `principal_id`.
///
/// Callers must have validated the principal beforehand; an empty value
/// here is a contract violation, not a skip. Individual grant updates are
/// independent, so a failed write logs and moves on to the next grant.
/// Returns whether at least one grant was rewritten.
pub async fn sync_role_assignments(
    store: &dyn ObjectStore,
    app_name: &str,
    principal_id: &str,
) -> Result<bool> {
    if principal_id.is_empty() {
        return Err(Error::MissingPrincipalId(app_name.to_string()));
    }

    let mut changed = false;
    for (variant, mut grant) in resolve_grants(store, app_name).await {
        // Write through the casing the object already carries; an object
        // with neither casing gets the camelCase field.
        let (field, current) = match probe_field(&grant.data, &SPEC_FOR_PROVIDER_PATH, &PRINCIPAL_ID_FIELDS)
        {
            Some((field, current)) => (field, Some(current)),
            None => (PRINCIPAL_ID_FIELDS[1], None),
        };

        if current == Some(principal_id) {
            continue;
        }

        let target = grant_ref(&grant);
        set_nested_str(&mut grant.data, &SPEC_FOR_PROVIDER_PATH, field, principal_id);

        match store.update_dynamic(variant, &grant).await {
            Ok(()) => {
                info!(
                    role_assignment = %target,
                    variant = %variant,
                    field = %field,
                    "Updated RoleAssignment principal"
                );
                changed = true;
            }
            Err(e) => {
                warn!(
                    role_assignment = %target,
                    variant = %variant,
                    error = %e,
                    "Failed to update RoleAssignment, continuing"
                );
            }
        }
    }

    Ok(changed)
}
