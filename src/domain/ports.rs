//! Domain Ports - Core trait definitions for the config operator
//!
//! These traits define the boundaries between the reconciliation logic and
//! the cluster. Kubernetes adapters implement them in production; tests use
//! in-memory fakes.

use crate::crd::StorageCluster;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Resource Addressing
// =============================================================================

/// Name and namespace of a namespaced resource
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub name: String,
    pub namespace: String,
}

impl ResourceKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// Who an owner reference points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerIdentity {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

impl OwnerIdentity {
    /// Same group and kind, ignoring version
    pub fn same_group_kind(&self, other: &OwnerIdentity) -> bool {
        self.kind == other.kind && api_group(&self.api_version) == api_group(&other.api_version)
    }

    /// Same group, kind and name; the identity a controller reference is upserted on
    pub fn same_object(&self, other: &OwnerIdentity) -> bool {
        self.same_group_kind(other) && self.name == other.name
    }
}

/// Group part of an apiVersion ("" for the core group)
fn api_group(api_version: &str) -> &str {
    api_version.rsplit_once('/').map_or("", |(group, _)| group)
}

/// Back-link from a resource to the entity responsible for its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub owner: OwnerIdentity,
    /// Marks the managing controller; at most one reference may set it
    pub controller: Option<bool>,
    /// Foreground deletion waits on this resource when set
    pub block_owner_deletion: Option<bool>,
}

impl OwnerRef {
    /// A controlling reference to `owner`
    pub fn controller_of(owner: OwnerIdentity) -> Self {
        Self {
            owner,
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    pub fn is_controller(&self) -> bool {
        self.controller == Some(true)
    }

    /// Demote to a plain, non-blocking reference
    pub fn released(self) -> Self {
        Self {
            owner: self.owner,
            controller: None,
            block_owner_deletion: None,
        }
    }
}

// =============================================================================
// Config Resource
// =============================================================================

/// A persisted, namespaced key/value resource (a ConfigMap)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResource {
    pub key: ResourceKey,
    pub data: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerRef>,
    /// Opaque version used by the store for conflict detection
    pub resource_version: Option<String>,
}

impl ConfigResource {
    /// An empty, not yet persisted resource
    pub fn new(key: ResourceKey) -> Self {
        Self {
            key,
            data: BTreeMap::new(),
            owner_references: Vec::new(),
            resource_version: None,
        }
    }

    /// The reference currently marked as controller, if any
    pub fn controller(&self) -> Option<&OwnerRef> {
        self.owner_references.iter().find(|r| r.is_controller())
    }
}

/// What a create-or-update call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

impl OperationResult {
    /// True when the store was written to
    pub fn is_change(&self) -> bool {
        !matches!(self, OperationResult::Unchanged)
    }
}

impl std::fmt::Display for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationResult::Created => write!(f, "created"),
            OperationResult::Updated => write!(f, "updated"),
            OperationResult::Unchanged => write!(f, "unchanged"),
        }
    }
}

// =============================================================================
// Workload Processes
// =============================================================================

/// Equality-based label selector ("app=rook-ceph-operator,tier=control")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector(pub BTreeMap<String, String>);

impl LabelSelector {
    /// Single `key=value` match
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(key.into(), value.into());
        Self(labels)
    }

    /// Parse a comma-separated list of `key=value` terms
    pub fn parse(input: &str) -> Result<Self> {
        let mut labels = BTreeMap::new();
        for term in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (key, value) = term
                .split_once('=')
                .ok_or_else(|| Error::SelectorParse(term.to_string()))?;
            let (key, value) = (key.trim(), value.trim());
            // Rejects `!=` and `==`, which the API server reads differently
            if !is_label_key(key) || !is_label_value(value) {
                return Err(Error::SelectorParse(term.to_string()));
            }
            labels.insert(key.to_string(), value.to_string());
        }
        if labels.is_empty() {
            return Err(Error::SelectorParse(input.to_string()));
        }
        Ok(Self(labels))
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }
}

/// `[prefix/]name`, prefix a DNS subdomain of at most 253 characters
fn is_label_key(key: &str) -> bool {
    match key.split_once('/') {
        Some((prefix, name)) => is_dns_subdomain(prefix) && is_label_name(name),
        None => is_label_name(key),
    }
}

/// Empty, or a label name
fn is_label_value(value: &str) -> bool {
    value.is_empty() || is_label_name(value)
}

/// At most 63 alphanumerics, `-`, `_` or `.`, alphanumeric at both ends
fn is_label_name(name: &str) -> bool {
    name.len() <= 63
        && name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_dns_subdomain(prefix: &str) -> bool {
    prefix.len() <= 253
        && prefix.split('.').all(|part| {
            part.len() <= 63
                && part.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
                && part.ends_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let terms: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", terms.join(","))
    }
}

/// Reference to a running workload process (a pod)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessRef {
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for ProcessRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// =============================================================================
// Config Map Store Port
// =============================================================================

/// Port for the key/value resource store
#[async_trait]
pub trait ConfigMapStore: Send + Sync {
    /// Fetch a resource, `None` if it does not exist
    async fn get(&self, key: &ResourceKey) -> Result<Option<ConfigResource>>;

    /// Create a resource that does not exist yet
    async fn create(&self, resource: &ConfigResource) -> Result<()>;

    /// Replace an existing resource; stale `resource_version` is a conflict
    async fn replace(&self, resource: &ConfigResource) -> Result<()>;
}

// =============================================================================
// Identity Source Port
// =============================================================================

/// Port for reading the external cluster identity
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Read the identity stored on the named singleton object
    async fn get(&self, singleton: &str) -> Result<String>;
}

// =============================================================================
// Process Registry Port
// =============================================================================

/// Port for enumerating and terminating workload processes
#[async_trait]
pub trait ProcessRegistry: Send + Sync {
    /// List processes in `namespace` matching `selector`
    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<ProcessRef>>;

    /// Request termination; the owning workload recreates the process
    async fn terminate(&self, process: &ProcessRef) -> Result<()>;
}

// =============================================================================
// Failure Domain Lookup Port
// =============================================================================

/// Port for resolving the topology domain label of a cluster
pub trait FailureDomainLookup: Send + Sync {
    /// Node label key for the cluster's failure domain, empty if unknown
    fn lookup(&self, cluster: &StorageCluster) -> String;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ConfigMapStoreRef = Arc<dyn ConfigMapStore>;
pub type IdentitySourceRef = Arc<dyn IdentitySource>;
pub type ProcessRegistryRef = Arc<dyn ProcessRegistry>;
pub type FailureDomainLookupRef = Arc<dyn FailureDomainLookup>;
