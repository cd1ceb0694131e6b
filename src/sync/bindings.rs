//! ServiceAccount binding synchronization
//!
//! Each namespace may carry one ServiceAccount named
//! `workload-identity-<app>`; its client-id annotation must mirror the
//! identity's client ID. Bindings are matched by their deterministic name,
//! never by search, and are only ever updated, never created.

use crate::sync::config::ControllerConfig;
use crate::sync::naming::service_account_name;
use crate::sync::store::ObjectStore;
use crate::sync::types::Result;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One binding that was actually rewritten this cycle. Drives the restart
/// trigger for exactly the namespaces that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingChange {
    pub namespace: String,
    pub name: String,
}

/// Converge every matching ServiceAccount onto `client_id`.
///
/// Absent bindings are skipped (not every namespace has one) and so are
/// bindings already carrying the right annotation; a second run with no
/// external change performs zero writes. A failed read of one namespace's
/// binding is logged and skipped, but a failed write is fatal for the
/// cycle: it means the API server or our permissions are broken, not that
/// the object drifted.
pub async fn sync_service_accounts(
    store: &dyn ObjectStore,
    config: &ControllerConfig,
    app_name: &str,
    client_id: &str,
) -> Result<Vec<BindingChange>> {
    let binding_name = service_account_name(&config.sync, app_name);
    let annotation_key = &config.sync.client_id_annotation;
    let mut changes = Vec::new();

    for namespace in store.list_namespaces().await? {
        let account = match store.get_service_account(&namespace, &binding_name).await {
            Ok(Some(account)) => account,
            Ok(None) => continue,
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    service_account = %binding_name,
                    error = %e,
                    "Could not read ServiceAccount, skipping namespace"
                );
                continue;
            }
        };

        let current = account
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(annotation_key));
        if current.map(String::as_str) == Some(client_id) {
            continue;
        }

        let mut updated = account;
        updated
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(annotation_key.clone(), client_id.to_string());
        store.update_service_account(&updated).await?;

        info!(
            namespace = %namespace,
            service_account = %binding_name,
            "Updated ServiceAccount client-id annotation"
        );
        changes.push(BindingChange {
            namespace,
            name: binding_name.clone(),
        });
    }

    Ok(changes)
}
