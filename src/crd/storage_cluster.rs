//! StorageCluster CRD
//!
//! The cluster-wide storage intent this operator derives CSI settings from.
//! Only the fields that feed the operator config are modelled; everything
//! else on the object is ignored.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// StorageCluster CRD
// =============================================================================

/// StorageCluster describes the desired shape of a Ceph-backed storage cluster.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "ocs.openshift.io",
    version = "v1",
    kind = "StorageCluster",
    plural = "storageclusters",
    shortname = "stcl",
    status = "StorageClusterStatus",
    printcolumn = r#"{"name": "External", "type": "boolean", "jsonPath": ".spec.externalStorage.enable"}"#,
    printcolumn = r#"{"name": "FailureDomain", "type": "string", "jsonPath": ".status.failureDomain"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterSpec {
    /// External (consumer-mode) Ceph cluster settings
    #[serde(default)]
    pub external_storage: ExternalStorageSpec,

    /// Whether remote storage consumers may attach to this cluster
    #[serde(default)]
    pub allow_remote_storage_consumers: bool,

    /// Resources managed on behalf of the cluster
    #[serde(default)]
    pub managed_resources: ManagedResourcesSpec,

    /// Wire-level network policy
    #[serde(default)]
    pub network: Option<NetworkSpec>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// External cluster mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalStorageSpec {
    #[serde(default)]
    pub enable: bool,
}

/// Managed resource toggles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResourcesSpec {
    /// Non-resilient (replica 1) pools, one per failure domain
    #[serde(default)]
    pub ceph_non_resilient_pools: NonResilientPoolsSpec,
}

/// Non-resilient pool settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NonResilientPoolsSpec {
    #[serde(default)]
    pub enable: bool,
}

/// Network policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Messenger connection settings
    #[serde(default)]
    pub connections: Option<ConnectionsSpec>,
}

/// Messenger connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsSpec {
    /// On-wire encryption
    #[serde(default)]
    pub encryption: Option<FeatureToggle>,

    /// On-wire compression
    #[serde(default)]
    pub compression: Option<FeatureToggle>,

    /// Refuse msgr1 connections
    #[serde(default)]
    pub require_msgr2: bool,
}

/// A feature that is either on or off
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggle {
    #[serde(default)]
    pub enabled: bool,
}

// =============================================================================
// Status
// =============================================================================

/// Status of the StorageCluster, as far as this operator reads it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterStatus {
    /// Failure domain chosen for the cluster (host, zone, rack)
    #[serde(default)]
    pub failure_domain: Option<String>,

    /// Node label key backing the failure domain
    #[serde(default)]
    pub failure_domain_key: Option<String>,
}

// =============================================================================
// Implementations
// =============================================================================

impl StorageClusterSpec {
    /// Connection settings, if a network policy with connections is present
    pub fn connections(&self) -> Option<&ConnectionsSpec> {
        self.network.as_ref().and_then(|n| n.connections.as_ref())
    }
}

impl ConnectionsSpec {
    pub fn encryption_enabled(&self) -> bool {
        self.encryption.map_or(false, |e| e.enabled)
    }

    pub fn compression_enabled(&self) -> bool {
        self.compression.map_or(false, |c| c.enabled)
    }
}

impl StorageCluster {
    /// Namespace of the cluster, defaulting to the operator namespace
    pub fn namespace_or(&self, fallback: &str) -> String {
        self.namespace().unwrap_or_else(|| fallback.to_string())
    }
}
