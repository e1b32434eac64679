//! Value Derivation
//!
//! Pure mapping from a StorageCluster spec to the CSI settings persisted in
//! the operator config map. No I/O happens here; identity and failure-domain
//! values are resolved by the caller and passed in.

use crate::crd::StorageClusterSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Keys
// =============================================================================

pub const CLUSTER_NAME_KEY: &str = "CSI_CLUSTER_NAME";
pub const ENABLE_READ_AFFINITY_KEY: &str = "CSI_ENABLE_READ_AFFINITY";
pub const CEPHFS_KERNEL_MOUNT_OPTIONS_KEY: &str = "CSI_CEPHFS_KERNEL_MOUNT_OPTIONS";
pub const ENABLE_TOPOLOGY_KEY: &str = "CSI_ENABLE_TOPOLOGY";
pub const TOPOLOGY_DOMAIN_LABELS_KEY: &str = "CSI_TOPOLOGY_DOMAIN_LABELS";

/// Every key this operator manages, in persistence order
pub const MANAGED_KEYS: [&str; 5] = [
    CLUSTER_NAME_KEY,
    ENABLE_READ_AFFINITY_KEY,
    CEPHFS_KERNEL_MOUNT_OPTIONS_KEY,
    ENABLE_TOPOLOGY_KEY,
    TOPOLOGY_DOMAIN_LABELS_KEY,
];

// =============================================================================
// Mount Options
// =============================================================================

/// CephFS kernel client messenger mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountOptions {
    /// msgr2 with on-wire encryption
    Secure,
    /// msgr2 when available, crc mode
    PreferCrc,
    /// msgr1
    Legacy,
}

impl MountOptions {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountOptions::Secure => "ms_mode=secure",
            MountOptions::PreferCrc => "ms_mode=prefer-crc",
            MountOptions::Legacy => "ms_mode=legacy",
        }
    }

    /// First matching rule wins. Network policy is checked before the
    /// deployment mode so an explicit wire setting is never downgraded.
    pub fn for_spec(spec: &StorageClusterSpec) -> Self {
        if let Some(conn) = spec.connections() {
            if conn.encryption_enabled() {
                return MountOptions::Secure;
            }
            if conn.compression_enabled() || conn.require_msgr2 {
                return MountOptions::PreferCrc;
            }
        }

        // External and provider clusters don't require msgr2
        if spec.external_storage.enable || spec.allow_remote_storage_consumers {
            return MountOptions::Legacy;
        }

        // Internal clusters run with msgr2 required by default
        MountOptions::PreferCrc
    }
}

impl std::fmt::Display for MountOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Derived Config
// =============================================================================

/// The full set of managed values for one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedConfig {
    pub cluster_name: String,
    pub enable_read_affinity: bool,
    pub cephfs_kernel_mount_options: MountOptions,
    pub enable_topology: bool,
    pub topology_domain_labels: String,
}

impl DerivedConfig {
    /// `(key, value)` pairs in [`MANAGED_KEYS`] order
    pub fn entries(&self) -> [(&'static str, String); 5] {
        [
            (CLUSTER_NAME_KEY, self.cluster_name.clone()),
            (ENABLE_READ_AFFINITY_KEY, self.enable_read_affinity.to_string()),
            (
                CEPHFS_KERNEL_MOUNT_OPTIONS_KEY,
                self.cephfs_kernel_mount_options.as_str().to_string(),
            ),
            (ENABLE_TOPOLOGY_KEY, self.enable_topology.to_string()),
            (TOPOLOGY_DOMAIN_LABELS_KEY, self.topology_domain_labels.clone()),
        ]
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

impl From<&DerivedConfig> for BTreeMap<String, String> {
    fn from(config: &DerivedConfig) -> Self {
        config.to_map()
    }
}

/// Derive the managed config values. Total over every spec.
pub fn derive(spec: &StorageClusterSpec, identity: &str, domain_label: &str) -> DerivedConfig {
    DerivedConfig {
        cluster_name: identity.to_string(),
        // Read affinity only helps when we run the OSDs ourselves
        enable_read_affinity: !spec.external_storage.enable,
        cephfs_kernel_mount_options: MountOptions::for_spec(spec),
        enable_topology: spec.managed_resources.ceph_non_resilient_pools.enable,
        topology_domain_labels: domain_label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ConnectionsSpec, FeatureToggle, NetworkSpec};

    fn with_connections(conn: ConnectionsSpec) -> StorageClusterSpec {
        StorageClusterSpec {
            network: Some(NetworkSpec {
                connections: Some(conn),
            }),
            ..Default::default()
        }
    }

    fn on() -> Option<FeatureToggle> {
        Some(FeatureToggle { enabled: true })
    }

    fn off() -> Option<FeatureToggle> {
        Some(FeatureToggle { enabled: false })
    }

    #[test]
    fn test_encryption_always_secure() {
        let mut spec = with_connections(ConnectionsSpec {
            encryption: on(),
            compression: on(),
            require_msgr2: true,
        });
        spec.external_storage.enable = true;
        spec.allow_remote_storage_consumers = true;
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::Secure);
    }

    #[test]
    fn test_compression_or_msgr2_prefers_crc() {
        let spec = with_connections(ConnectionsSpec {
            encryption: off(),
            compression: on(),
            require_msgr2: false,
        });
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::PreferCrc);

        let mut spec = with_connections(ConnectionsSpec {
            require_msgr2: true,
            ..Default::default()
        });
        spec.allow_remote_storage_consumers = true;
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::PreferCrc);
    }

    #[test]
    fn test_external_or_provider_is_legacy() {
        let mut spec = StorageClusterSpec::default();
        spec.external_storage.enable = true;
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::Legacy);

        let mut spec = StorageClusterSpec::default();
        spec.allow_remote_storage_consumers = true;
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::Legacy);

        // Network policy present but nothing enabled falls through
        let mut spec = with_connections(ConnectionsSpec {
            encryption: off(),
            compression: off(),
            require_msgr2: false,
        });
        spec.external_storage.enable = true;
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::Legacy);
    }

    #[test]
    fn test_network_without_connections_falls_through() {
        let mut spec = StorageClusterSpec {
            network: Some(NetworkSpec { connections: None }),
            ..Default::default()
        };
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::PreferCrc);

        spec.external_storage.enable = true;
        assert_eq!(MountOptions::for_spec(&spec), MountOptions::Legacy);
        assert_eq!(MountOptions::for_spec(&spec).to_string(), "ms_mode=legacy");
    }

    #[test]
    fn test_default_prefers_crc() {
        assert_eq!(
            MountOptions::for_spec(&StorageClusterSpec::default()),
            MountOptions::PreferCrc
        );
        assert_eq!(MountOptions::PreferCrc.to_string(), "ms_mode=prefer-crc");
    }

    #[test]
    fn test_external_with_compression_overrides_legacy() {
        let mut spec = with_connections(ConnectionsSpec {
            encryption: off(),
            compression: on(),
            require_msgr2: false,
        });
        spec.external_storage.enable = true;

        let derived = derive(&spec, "cluster-id", "");
        assert_eq!(derived.cephfs_kernel_mount_options, MountOptions::PreferCrc);
        assert!(!derived.enable_read_affinity);
    }

    #[test]
    fn test_internal_non_resilient_scenario() {
        let mut spec = StorageClusterSpec::default();
        spec.managed_resources.ceph_non_resilient_pools.enable = true;

        let derived = derive(&spec, "", "topology.kubernetes.io/zone");
        let map = derived.to_map();
        assert_eq!(map[CLUSTER_NAME_KEY], "");
        assert_eq!(map[ENABLE_READ_AFFINITY_KEY], "true");
        assert_eq!(map[ENABLE_TOPOLOGY_KEY], "true");
        assert_eq!(map[CEPHFS_KERNEL_MOUNT_OPTIONS_KEY], "ms_mode=prefer-crc");
        assert_eq!(map[TOPOLOGY_DOMAIN_LABELS_KEY], "topology.kubernetes.io/zone");
    }

    #[test]
    fn test_derive_is_deterministic_and_total() {
        let spec = with_connections(ConnectionsSpec {
            encryption: on(),
            ..Default::default()
        });
        let a = derive(&spec, "id", "kubernetes.io/hostname");
        let b = derive(&spec, "id", "kubernetes.io/hostname");
        assert_eq!(a, b);

        let map = a.to_map();
        assert_eq!(map.len(), MANAGED_KEYS.len());
        for key in MANAGED_KEYS {
            assert!(map.contains_key(key), "missing {}", key);
        }
    }
}
