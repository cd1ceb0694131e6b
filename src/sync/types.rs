//! Shared types for the identity sync controllers

use crate::sync::config::ControllerConfig;
use crate::sync::store::ObjectStore;
use std::sync::Arc;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("principalID is empty for identity '{0}'")]
    MissingPrincipalId(String),

    #[error("deployment index unavailable: {0}")]
    IndexUnavailable(String),
}

/// Lookup key for one identity, taken from the watched object.
///
/// Cluster-scoped schema variants ignore the namespace; namespaced variants
/// require it and are skipped when the key carries none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub name: String,
    pub namespace: Option<String>,
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Shared context handed to every reconcile invocation
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn ObjectStore>,
    pub config: Arc<ControllerConfig>,
}
