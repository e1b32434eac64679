//! Identity Resolver
//!
//! Best-effort lookup of the cluster identity. A failed lookup leaves
//! `CSI_CLUSTER_NAME` empty for the pass instead of failing it.

use crate::domain::ports::IdentitySourceRef;
use tracing::{debug, error};

/// Name of the cluster-scoped ClusterVersion singleton
pub const DEFAULT_IDENTITY_SINGLETON: &str = "version";

/// Resolves the cluster identity through an [`IdentitySource`](crate::domain::IdentitySource)
#[derive(Clone)]
pub struct IdentityResolver {
    source: IdentitySourceRef,
    singleton: String,
}

impl IdentityResolver {
    pub fn new(source: IdentitySourceRef, singleton: impl Into<String>) -> Self {
        Self {
            source,
            singleton: singleton.into(),
        }
    }

    /// Fetch the identity, or an empty string if it cannot be read
    pub async fn resolve(&self) -> String {
        match self.source.get(&self.singleton).await {
            Ok(identity) => {
                debug!(singleton = %self.singleton, identity = %identity, "Resolved cluster identity");
                identity
            }
            Err(e) => {
                error!(
                    singleton = %self.singleton,
                    error = %e,
                    "Failed to get the cluster identity"
                );
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::testing::StaticIdentity;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_resolve_identity() {
        let resolver = IdentityResolver::new(
            Arc::new(StaticIdentity::ok("4f0c2c1e-cluster")),
            DEFAULT_IDENTITY_SINGLETON,
        );
        assert_eq!(resolver.resolve().await, "4f0c2c1e-cluster");
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty() {
        let resolver =
            IdentityResolver::new(Arc::new(StaticIdentity::failing()), DEFAULT_IDENTITY_SINGLETON);
        assert_eq!(resolver.resolve().await, "");
    }
}
