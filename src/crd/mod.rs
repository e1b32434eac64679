//! Custom Resource Definitions read by the operator
//!
//! - StorageCluster: cluster-wide storage intent

pub mod storage_cluster;

pub use storage_cluster::*;
