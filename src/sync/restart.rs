//! Deployment restart trigger
//!
//! After a binding change, every Deployment whose pod template references
//! the changed ServiceAccount gets a restart-marker annotation stamped on
//! its pod template, rolling the pods so they pick up the new client ID.
//! This is best effort end to end: a missed restart is retried on the next
//! cycle that detects a binding change.

use crate::sync::bindings::BindingChange;
use crate::sync::config::ControllerConfig;
use crate::sync::store::ObjectStore;
use chrono::Utc;
use kube::ResourceExt;
use serde_json::json;
use tracing::{info, warn};

/// Roll every Deployment referencing the changed binding. Failures are
/// logged and never propagated; remaining Deployments are still processed.
pub async fn restart_deployments(
    store: &dyn ObjectStore,
    config: &ControllerConfig,
    change: &BindingChange,
) {
    let deployments = match store
        .deployments_for_service_account(&change.namespace, &change.name)
        .await
    {
        Ok(deployments) => deployments,
        Err(e) => {
            warn!(
                namespace = %change.namespace,
                service_account = %change.name,
                error = %e,
                "Could not look up Deployments for changed binding"
            );
            return;
        }
    };

    let marker = Utc::now().to_rfc3339();
    for deployment in deployments {
        let name = deployment.name_any();
        let patch = json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": {
                            config.sync.restart_annotation.as_str(): marker.clone(),
                        }
                    }
                }
            }
        });

        match store
            .patch_deployment(&change.namespace, &name, patch)
            .await
        {
            Ok(()) => {
                info!(
                    namespace = %change.namespace,
                    deployment = %name,
                    "Restarted Deployment after binding update"
                );
            }
            Err(e) => {
                warn!(
                    namespace = %change.namespace,
                    deployment = %name,
                    error = %e,
                    "Failed to annotate Deployment for restart"
                );
            }
        }
    }
}
