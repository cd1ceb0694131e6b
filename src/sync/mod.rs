use futures::{future, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DynamicObject};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub mod bindings;
pub mod config;
pub mod controller;
pub mod grants;
pub mod naming;
pub mod restart;
pub mod schema;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use config::ControllerConfig;
pub use controller::{run_cycle, CycleOutcome};
pub use types::{Error, IdentityKey, Result};

use store::KubeStore;
use types::Context;

/// Main entry point for the identity sync controller
#[instrument(skip(client, config))]
pub async fn run(client: Client, config: ControllerConfig) -> Result<()> {
    info!("Starting identity sync controller");

    // Build the serviceAccountName index before accepting any work: a
    // cluster-wide Deployment reflector the restart trigger reads from.
    let deployments: Api<Deployment> = Api::all(client.clone());
    let (reader, writer) = reflector::store::<Deployment>();
    let deployment_watch = reflector(
        writer,
        watcher(deployments, watcher::Config::default()).default_backoff(),
    );
    tokio::spawn(async move {
        deployment_watch
            .applied_objects()
            .for_each(|event| {
                if let Err(e) = event {
                    warn!(error = %e, "Deployment reflector stream error");
                }
                future::ready(())
            })
            .await;
    });
    reader
        .wait_until_ready()
        .await
        .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
    info!("Deployment index populated");

    let context = Arc::new(Context {
        store: Arc::new(KubeStore::new(client.clone(), reader)),
        config: Arc::new(config),
    });

    // Primary watch is the namespaced identity variant; the legacy
    // cluster-scoped variant feeds the same queue mapped by name.
    let primary = &schema::IDENTITY_VARIANTS[1];
    let primary_resource = primary.api_resource();
    let identities: Api<DynamicObject> = Api::all_with(client.clone(), &primary_resource);

    let legacy = &schema::IDENTITY_VARIANTS[0];
    let legacy_resource = legacy.api_resource();
    let legacy_identities: Api<DynamicObject> = Api::all_with(client.clone(), &legacy_resource);

    let watcher_config = watcher::Config::default().any_semantic();
    let mapper_resource = primary_resource.clone();

    Controller::new_with(identities, watcher_config.clone(), primary_resource)
        .watches_with(
            legacy_identities,
            legacy_resource,
            watcher_config,
            move |identity: DynamicObject| {
                let mut target =
                    ObjectRef::<DynamicObject>::new_with(&identity.name_any(), mapper_resource.clone());
                if let Some(namespace) = identity.namespace() {
                    target = target.within(&namespace);
                }
                std::iter::once(target)
            },
        )
        .run(reconcile, error_policy, context)
        .for_each(|reconciliation_result| async move {
            match reconciliation_result {
                Ok(identity) => {
                    info!(resource = ?identity, "Identity reconciliation successful");
                }
                Err(e) => {
                    error!(error = ?e, "Identity reconciliation error");
                }
            }
        })
        .await;

    info!("Identity sync controller shutting down");
    Ok(())
}

/// Reconcile one identity: run a convergence cycle and translate its
/// outcome into a requeue decision. The cycle re-reads everything from the
/// cluster, so the watched object itself only contributes its key.
#[instrument(skip(identity, ctx), fields(identity = %identity.name_any()))]
async fn reconcile(identity: Arc<DynamicObject>, ctx: Arc<Context>) -> Result<Action> {
    let key = IdentityKey {
        name: identity.name_any(),
        namespace: identity.namespace(),
    };

    let outcome = controller::run_cycle(ctx.store.as_ref(), &ctx.config, &key).await?;

    Ok(match outcome {
        CycleOutcome::IdentityGone => Action::await_change(),
        CycleOutcome::Unprovisioned | CycleOutcome::InvalidName => {
            Action::requeue(ctx.config.requeue.unprovisioned())
        }
        CycleOutcome::Converged { changed: true } => {
            info!(identity = %key, "Updates applied, rechecking to ensure state");
            Action::requeue(ctx.config.requeue.changed())
        }
        CycleOutcome::Converged { changed: false } => Action::requeue(ctx.config.requeue.steady()),
    })
}

/// Error policy: back off and retry; the runtime keeps the retry count
fn error_policy(identity: Arc<DynamicObject>, err: &Error, ctx: Arc<Context>) -> Action {
    error!(
        error = ?err,
        identity = %identity.name_any(),
        "Identity reconciliation failed, backing off"
    );
    Action::requeue(ctx.config.requeue.error_backoff())
}
