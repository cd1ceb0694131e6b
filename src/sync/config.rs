//! Identity Operator Configuration
//!
//! Loaded from the ConfigMap mounted at `/config/config.yaml`. Every field
//! has a default so a partial (or missing) file still yields a working
//! configuration.

use crate::sync::types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Main controller configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Annotation keys and naming conventions for synced objects
    #[serde(default)]
    pub sync: SyncConfig,

    /// Requeue intervals for the convergence loop
    #[serde(default)]
    pub requeue: RequeueConfig,
}

/// Naming and annotation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Prefix for the per-app ServiceAccount name
    #[serde(default = "default_service_account_prefix", rename = "serviceAccountPrefix")]
    pub service_account_prefix: String,

    /// ServiceAccount annotation carrying the identity's client ID
    #[serde(default = "default_client_id_annotation", rename = "clientIdAnnotation")]
    pub client_id_annotation: String,

    /// Pod template annotation used to roll Deployments after a binding change
    #[serde(default = "default_restart_annotation", rename = "restartAnnotation")]
    pub restart_annotation: String,
}

/// Requeue intervals, in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequeueConfig {
    /// Recheck after a cycle that applied at least one write
    #[serde(default = "default_changed_seconds", rename = "changedSeconds")]
    pub changed_seconds: u64,

    /// Steady-state drift check when nothing changed
    #[serde(default = "default_steady_seconds", rename = "steadySeconds")]
    pub steady_seconds: u64,

    /// Identity exists but has no client/principal ID yet (or a bad name)
    #[serde(default = "default_unprovisioned_seconds", rename = "unprovisionedSeconds")]
    pub unprovisioned_seconds: u64,

    /// Backoff after a failed cycle
    #[serde(default = "default_error_backoff_seconds", rename = "errorBackoffSeconds")]
    pub error_backoff_seconds: u64,
}

fn default_service_account_prefix() -> String {
    "workload-identity-".to_string()
}

fn default_client_id_annotation() -> String {
    "azure.workload.identity/client-id".to_string()
}

fn default_restart_annotation() -> String {
    "azure.workload.identity/restart".to_string()
}

fn default_changed_seconds() -> u64 {
    60
}

fn default_steady_seconds() -> u64 {
    120
}

fn default_unprovisioned_seconds() -> u64 {
    300
}

fn default_error_backoff_seconds() -> u64 {
    60
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            service_account_prefix: default_service_account_prefix(),
            client_id_annotation: default_client_id_annotation(),
            restart_annotation: default_restart_annotation(),
        }
    }
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            changed_seconds: default_changed_seconds(),
            steady_seconds: default_steady_seconds(),
            unprovisioned_seconds: default_unprovisioned_seconds(),
            error_backoff_seconds: default_error_backoff_seconds(),
        }
    }
}

impl RequeueConfig {
    pub fn changed(&self) -> Duration {
        Duration::from_secs(self.changed_seconds)
    }

    pub fn steady(&self) -> Duration {
        Duration::from_secs(self.steady_seconds)
    }

    pub fn unprovisioned(&self) -> Duration {
        Duration::from_secs(self.unprovisioned_seconds)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }
}

impl ControllerConfig {
    /// Load configuration from a mounted file, falling back to defaults on
    /// any read or parse problem.
    pub fn from_mounted_file(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config at {path}, using defaults: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config at {path}, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Validate that the configuration is internally usable
    pub fn validate(&self) -> Result<()> {
        if self.sync.service_account_prefix.trim().is_empty() {
            return Err(Error::ConfigError(
                "sync.serviceAccountPrefix must not be empty".to_string(),
            ));
        }
        if self.sync.client_id_annotation.trim().is_empty() {
            return Err(Error::ConfigError(
                "sync.clientIdAnnotation must not be empty".to_string(),
            ));
        }
        if self.sync.restart_annotation.trim().is_empty() {
            return Err(Error::ConfigError(
                "sync.restartAnnotation must not be empty".to_string(),
            ));
        }
        if self.requeue.changed_seconds == 0
            || self.requeue.steady_seconds == 0
            || self.requeue.unprovisioned_seconds == 0
            || self.requeue.error_backoff_seconds == 0
        {
            return Err(Error::ConfigError(
                "requeue intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.service_account_prefix, "workload-identity-");
        assert_eq!(
            config.sync.client_id_annotation,
            "azure.workload.identity/client-id"
        );
        assert_eq!(config.requeue.changed(), Duration::from_secs(60));
        assert_eq!(config.requeue.steady(), Duration::from_secs(120));
        assert_eq!(config.requeue.unprovisioned(), Duration::from_secs(300));
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = r"
requeue:
  steadySeconds: 600
";
        let config: ControllerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.requeue.steady_seconds, 600);
        assert_eq!(config.requeue.changed_seconds, 60);
        assert_eq!(config.sync.restart_annotation, "azure.workload.identity/restart");
    }

    #[test]
    fn zero_interval_fails_validation() {
        let mut config = ControllerConfig::default();
        config.requeue.steady_seconds = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn empty_annotation_fails_validation() {
        let mut config = ControllerConfig::default();
        config.sync.client_id_annotation = "  ".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }
}
