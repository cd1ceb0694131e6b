//! Object store access
//!
//! Everything the sync engine needs from the cluster, behind one trait so
//! the convergence logic can be driven by an in-memory implementation in
//! tests. The production implementation wraps a `kube::Client` plus the
//! Deployment reflector that serves as the serviceAccountName index.

use crate::sync::schema::{SchemaVariant, VariantScope};
use crate::sync::types::{IdentityKey, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use kube::api::{Api, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::runtime::reflector::Store;
use kube::{Client, ResourceExt};
use serde_json::Value;

/// Cluster operations consumed by the sync engine
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object of a schema variant. `Ok(None)` means not found,
    /// which callers treat as "try the next variant".
    async fn get_dynamic(
        &self,
        variant: &SchemaVariant,
        key: &IdentityKey,
    ) -> Result<Option<DynamicObject>>;

    /// List objects of a schema variant matching a label selector,
    /// across all namespaces for namespaced variants.
    async fn list_dynamic(
        &self,
        variant: &SchemaVariant,
        selector: &str,
    ) -> Result<Vec<DynamicObject>>;

    /// Replace one object of a schema variant
    async fn update_dynamic(&self, variant: &SchemaVariant, object: &DynamicObject) -> Result<()>;

    /// Names of every namespace in the cluster
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Fetch a ServiceAccount by namespace and name; `Ok(None)` on absence
    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>>;

    /// Replace a ServiceAccount
    async fn update_service_account(&self, account: &ServiceAccount) -> Result<()>;

    /// Deployments in `namespace` whose pod template references the
    /// ServiceAccount. Served from the index built at startup, not a scan.
    async fn deployments_for_service_account(
        &self,
        namespace: &str,
        account: &str,
    ) -> Result<Vec<Deployment>>;

    /// Merge-patch one Deployment
    async fn patch_deployment(&self, namespace: &str, name: &str, patch: Value) -> Result<()>;
}

/// Production store backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
    deployments: Store<Deployment>,
}

impl KubeStore {
    pub fn new(client: Client, deployments: Store<Deployment>) -> Self {
        Self {
            client,
            deployments,
        }
    }

    fn dynamic_api(&self, variant: &SchemaVariant, namespace: Option<&str>) -> Api<DynamicObject> {
        let resource = variant.api_resource();
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

fn absent_on_404<T>(result: kube::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(object) => Ok(Some(object)),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_dynamic(
        &self,
        variant: &SchemaVariant,
        key: &IdentityKey,
    ) -> Result<Option<DynamicObject>> {
        let namespace = match variant.scope {
            VariantScope::Cluster => None,
            VariantScope::Namespaced => key.namespace.as_deref(),
        };
        absent_on_404(self.dynamic_api(variant, namespace).get(&key.name).await)
    }

    async fn list_dynamic(
        &self,
        variant: &SchemaVariant,
        selector: &str,
    ) -> Result<Vec<DynamicObject>> {
        let params = ListParams::default().labels(selector);
        let list = self.dynamic_api(variant, None).list(&params).await?;
        Ok(list.items)
    }

    async fn update_dynamic(&self, variant: &SchemaVariant, object: &DynamicObject) -> Result<()> {
        let api = self.dynamic_api(variant, object.namespace().as_deref());
        api.replace(&object.name_any(), &PostParams::default(), object)
            .await?;
        Ok(())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(ResourceExt::name_any).collect())
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        absent_on_404(api.get(name).await)
    }

    async fn update_service_account(&self, account: &ServiceAccount) -> Result<()> {
        let namespace = account.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), &namespace);
        api.replace(&account.name_any(), &PostParams::default(), account)
            .await?;
        Ok(())
    }

    async fn deployments_for_service_account(
        &self,
        namespace: &str,
        account: &str,
    ) -> Result<Vec<Deployment>> {
        let matches = self
            .deployments
            .state()
            .into_iter()
            .filter(|deployment| {
                deployment.namespace().as_deref() == Some(namespace)
                    && deployment
                        .spec
                        .as_ref()
                        .and_then(|spec| spec.template.spec.as_ref())
                        .and_then(|pod| pod.service_account_name.as_deref())
                        == Some(account)
            })
            .map(|deployment| (*deployment).clone())
            .collect();
        Ok(matches)
    }

    async fn patch_deployment(&self, namespace: &str, name: &str, patch: Value) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}
