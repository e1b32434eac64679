//! Failure domain lookup
//!
//! Maps the failure domain recorded on a StorageCluster to the node label
//! key CSI uses for topology-aware provisioning.

use crate::crd::StorageCluster;
use crate::domain::ports::FailureDomainLookup;
use tracing::debug;

pub const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";
pub const RACK_LABEL: &str = "topology.rook.io/rack";

/// Label key for a well-known failure domain name
pub fn label_for_domain(domain: &str) -> Option<&'static str> {
    match domain.to_lowercase().as_str() {
        "host" => Some(HOSTNAME_LABEL),
        "zone" => Some(ZONE_LABEL),
        "rack" => Some(RACK_LABEL),
        _ => None,
    }
}

/// Reads the failure domain from the StorageCluster status
///
/// An explicit `failureDomainKey` wins; otherwise `failureDomain` is mapped
/// through [`label_for_domain`]. Anything else yields an empty label.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusFailureDomain;

impl FailureDomainLookup for StatusFailureDomain {
    fn lookup(&self, cluster: &StorageCluster) -> String {
        let Some(status) = cluster.status.as_ref() else {
            return String::new();
        };

        if let Some(key) = status.failure_domain_key.as_deref().filter(|k| !k.is_empty()) {
            return key.to_string();
        }

        match status.failure_domain.as_deref() {
            Some(domain) => label_for_domain(domain)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    debug!(domain = %domain, "Unknown failure domain, leaving topology label empty");
                    String::new()
                }),
            None => String::new(),
        }
    }
}
