//! Operator Config Control Plane
//!
//! Derives CSI settings from a StorageCluster, converges the operator
//! config map onto them and restarts the pods that consume it.

pub mod config_reconciler;
pub mod controller;
pub mod derivation;
pub mod failure_domain;
pub mod identity;
pub mod kubernetes;
pub mod metrics;
pub mod orchestrator;
pub mod restart;

#[cfg(test)]
pub(crate) mod testing;

pub use config_reconciler::*;
pub use derivation::*;
pub use failure_domain::*;
pub use identity::*;
pub use kubernetes::*;
pub use metrics::*;
pub use orchestrator::*;
pub use restart::*;
