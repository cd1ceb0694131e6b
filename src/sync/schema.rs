//! Schema variant resolution
//!
//! The Upbound managed resources this operator consumes have drifted across
//! API groups, scopes and field casings over time. Every known
//! representation is listed here as data; one resolution routine walks the
//! list so that supporting a new representation is a table entry, not a new
//! code path.

use crate::sync::naming::{extract_app_name, grant_selector};
use crate::sync::store::ObjectStore;
use crate::sync::types::{IdentityKey, Result};
use kube::api::DynamicObject;
use kube::core::{ApiResource, GroupVersionKind};
use kube::ResourceExt;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantScope {
    Cluster,
    Namespaced,
}

/// One historical representation of a logical resource
#[derive(Debug, PartialEq, Eq)]
pub struct SchemaVariant {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub scope: VariantScope,
}

impl SchemaVariant {
    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk(&GroupVersionKind::gvk(self.group, self.version, self.kind))
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} {}", self.group, self.version, self.kind)
    }
}

/// Known UserAssignedIdentity representations, in resolution order
pub static IDENTITY_VARIANTS: &[SchemaVariant] = &[
    SchemaVariant {
        group: "managedidentity.azure.upbound.io",
        version: "v1beta1",
        kind: "UserAssignedIdentity",
        scope: VariantScope::Cluster,
    },
    SchemaVariant {
        group: "managedidentity.azure.m.upbound.io",
        version: "v1beta1",
        kind: "UserAssignedIdentity",
        scope: VariantScope::Namespaced,
    },
];

/// Known RoleAssignment representations. Unlike identities, grants may
/// legitimately exist under several representations at once, so these are
/// always fanned out rather than resolved first-wins.
pub static GRANT_VARIANTS: &[SchemaVariant] = &[
    SchemaVariant {
        group: "authorization.azure.upbound.io",
        version: "v1beta1",
        kind: "RoleAssignment",
        scope: VariantScope::Cluster,
    },
    SchemaVariant {
        group: "authorization.azure.m.upbound.io",
        version: "v1beta1",
        kind: "RoleAssignment",
        scope: VariantScope::Namespaced,
    },
];

/// Both accepted casings of the identifier fields, canonical first
pub static CLIENT_ID_FIELDS: [&str; 2] = ["clientID", "clientId"];
pub static PRINCIPAL_ID_FIELDS: [&str; 2] = ["principalID", "principalId"];

pub static IDENTITY_STATUS_PATH: [&str; 2] = ["status", "atProvider"];
pub static SPEC_FOR_PROVIDER_PATH: [&str; 2] = ["spec", "forProvider"];

/// Identity data extracted from whichever variant resolved
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub client_id: Option<String>,
    pub principal_id: Option<String>,
    pub app_name: String,
    pub variant: &'static SchemaVariant,
}

/// Walk `path` through nested JSON objects and return the string at `field`
pub fn nested_str<'a>(data: &'a Value, path: &[&str], field: &str) -> Option<&'a str> {
    let mut current = data;
    for segment in path {
        current = current.get(segment)?;
    }
    current.get(field)?.as_str()
}

/// Probe both casings of a field, canonical first. Returns the casing that
/// matched so writers can preserve the object's existing representation.
pub fn probe_field<'a>(
    data: &'a Value,
    path: &[&str],
    casings: &[&'static str; 2],
) -> Option<(&'static str, &'a str)> {
    for casing in casings {
        if let Some(value) = nested_str(data, path, casing) {
            return Some((casing, value));
        }
    }
    None
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Set a string field under `path`, creating intermediate objects as needed
pub fn set_nested_str(data: &mut Value, path: &[&str], field: &str, value: &str) {
    let mut current = data;
    for segment in path {
        current = ensure_object(current)
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(field.to_string(), Value::String(value.to_string()));
}

/// Resolve the identity source across all known variants, first hit wins.
///
/// A miss or a read failure on one variant is not fatal; older or alternate
/// representations may still resolve. `Ok(None)` means the identity exists
/// under no known representation.
pub async fn resolve_identity(
    store: &dyn ObjectStore,
    key: &IdentityKey,
) -> Result<Option<ResolvedIdentity>> {
    for variant in IDENTITY_VARIANTS {
        if variant.scope == VariantScope::Namespaced && key.namespace.is_none() {
            debug!(variant = %variant, identity = %key, "Skipping namespaced variant for cluster-scoped key");
            continue;
        }

        let identity = match store.get_dynamic(variant, key).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                debug!(variant = %variant, identity = %key, "Identity not found under variant");
                continue;
            }
            Err(e) => {
                debug!(variant = %variant, identity = %key, error = %e, "Error fetching identity under variant");
                continue;
            }
        };

        info!(variant = %variant, identity = %key, "Found UserAssignedIdentity");

        let client_id = probe_field(&identity.data, &IDENTITY_STATUS_PATH, &CLIENT_ID_FIELDS)
            .map(|(_, v)| v.to_string());
        let principal_id = probe_field(&identity.data, &IDENTITY_STATUS_PATH, &PRINCIPAL_ID_FIELDS)
            .map(|(_, v)| v.to_string());

        let display_name = nested_str(&identity.data, &SPEC_FOR_PROVIDER_PATH, "name").unwrap_or_default();
        let app_name = extract_app_name(display_name).to_string();

        return Ok(Some(ResolvedIdentity {
            client_id,
            principal_id,
            app_name,
            variant,
        }));
    }

    Ok(None)
}

/// List the application's grants across every variant and scope,
/// concatenating results. A failed list on one variant is logged and
/// skipped; the remaining variants still contribute.
pub async fn resolve_grants(
    store: &dyn ObjectStore,
    app_name: &str,
) -> Vec<(&'static SchemaVariant, DynamicObject)> {
    let selector = grant_selector(app_name);
    let mut grants = Vec::new();

    for variant in GRANT_VARIANTS {
        match store.list_dynamic(variant, &selector).await {
            Ok(items) => {
                if !items.is_empty() {
                    info!(variant = %variant, count = items.len(), "Found RoleAssignments");
                }
                grants.extend(items.into_iter().map(|item| (variant, item)));
            }
            Err(e) => {
                warn!(variant = %variant, error = %e, "Could not list RoleAssignments under variant");
            }
        }
    }

    grants
}

/// Name plus optional namespace of a grant, for log lines
pub fn grant_ref(grant: &DynamicObject) -> String {
    match grant.namespace() {
        Some(ns) => format!("{ns}/{}", grant.name_any()),
        None => grant.name_any(),
    }
}
