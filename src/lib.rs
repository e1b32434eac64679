//! Storage Config Operator
//!
//! A Kubernetes operator that keeps the CSI operator config map in line
//! with the StorageCluster it belongs to.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                    StorageCluster Controller                         │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────┐   ┌────────────────┐                              │
//! │  │   Identity    │   │ Failure Domain │                              │
//! │  │   Resolver    │   │    Lookup      │                              │
//! │  └───────┬───────┘   └───────┬────────┘                              │
//! │          └─────────┬─────────┘                                       │
//! │            ┌───────┴────────┐   ┌─────────────────┐   ┌────────────┐ │
//! │            │     Value      │──▶│  Config Map     │──▶│ Dependent  │ │
//! │            │   Derivation   │   │  Reconciler     │   │ Restarts   │ │
//! │            └────────────────┘   └─────────────────┘   └────────────┘ │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                       Kubernetes Adapters                            │
//! │        ConfigMaps  ·  Pods  ·  ClusterVersion (config.openshift.io)  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: Derivation, reconciliation, restarts and the controller
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod controlplane;
pub mod crd;
pub mod domain;
pub mod error;

// Re-export commonly used types
pub use controlplane::{
    derive, ConfigReconciler, DerivedConfig, IdentityResolver, KubeAdapters, MountOptions,
    OperatorConfig, Orchestrator, PassOutcome, ReconcileMetrics, RestartController,
    RestartReport, StatusFailureDomain,
};

pub use crd::{StorageCluster, StorageClusterSpec, StorageClusterStatus};

pub use domain::ports::{
    ConfigMapStore, ConfigResource, FailureDomainLookup, IdentitySource, LabelSelector,
    OperationResult, OwnerIdentity, OwnerRef, ProcessRef, ProcessRegistry, ResourceKey,
};

pub use error::{Error, ErrorAction, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
