//! Kubernetes Adapters
//!
//! kube-backed implementations of the domain ports:
//! - ConfigMaps: operator config persistence
//! - Pods: dependent workload registry
//! - ClusterVersion: cluster identity

pub mod cluster_version;
pub mod config_maps;
pub mod pods;

pub use cluster_version::*;
pub use config_maps::*;
pub use pods::*;

use crate::domain::ports::{ConfigMapStoreRef, IdentitySourceRef, ProcessRegistryRef};
use kube::Client;
use std::sync::Arc;

/// The full set of Kubernetes-backed ports
#[derive(Clone)]
pub struct KubeAdapters {
    pub config_maps: ConfigMapStoreRef,
    pub identity: IdentitySourceRef,
    pub pods: ProcessRegistryRef,
}

impl KubeAdapters {
    /// Create every adapter from one client
    pub fn new(client: Client) -> Self {
        Self {
            config_maps: Arc::new(KubeConfigMapStore::new(client.clone())),
            identity: Arc::new(ClusterVersionIdentity::new(client.clone())),
            pods: Arc::new(KubePodRegistry::new(client)),
        }
    }
}
