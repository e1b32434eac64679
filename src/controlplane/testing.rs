//! In-memory fakes of the domain ports for unit tests

use crate::domain::ports::{
    ConfigMapStore, ConfigResource, IdentitySource, LabelSelector, OwnerIdentity, ProcessRef,
    ProcessRegistry, ResourceKey,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

pub fn owner(kind: &str, name: &str) -> OwnerIdentity {
    OwnerIdentity {
        api_version: "ocs.openshift.io/v1".into(),
        kind: kind.into(),
        name: name.into(),
        uid: format!("uid-{}", name),
    }
}

// =============================================================================
// Config Map Store
// =============================================================================

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<ResourceKey, ConfigResource>,
    writes: usize,
    fail_writes: bool,
    next_version: u64,
}

impl StoreState {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

#[derive(Default)]
pub struct MemoryConfigMapStore {
    state: RwLock<StoreState>,
}

impl MemoryConfigMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a write
    pub async fn insert(&self, mut resource: ConfigResource) {
        let mut state = self.state.write().await;
        resource.resource_version = Some(state.bump());
        state.objects.insert(resource.key.clone(), resource);
    }

    pub async fn snapshot(&self, key: &ResourceKey) -> Option<ConfigResource> {
        self.state.read().await.objects.get(key).cloned()
    }

    pub async fn writes(&self) -> usize {
        self.state.read().await.writes
    }

    pub async fn fail_writes(&self, fail: bool) {
        self.state.write().await.fail_writes = fail;
    }

    fn conflict(key: &ResourceKey, reason: &str) -> Error {
        Error::Conflict {
            kind: "ConfigMap".into(),
            name: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ConfigMapStore for MemoryConfigMapStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<ConfigResource>> {
        Ok(self.snapshot(key).await)
    }

    async fn create(&self, resource: &ConfigResource) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_writes {
            return Err(Self::conflict(&resource.key, "injected failure"));
        }
        if state.objects.contains_key(&resource.key) {
            return Err(Error::ResourceExists {
                kind: "ConfigMap".into(),
                name: resource.key.to_string(),
            });
        }
        let mut stored = resource.clone();
        stored.resource_version = Some(state.bump());
        state.objects.insert(stored.key.clone(), stored);
        state.writes += 1;
        Ok(())
    }

    async fn replace(&self, resource: &ConfigResource) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_writes {
            return Err(Self::conflict(&resource.key, "injected failure"));
        }
        let current = state
            .objects
            .get(&resource.key)
            .map(|r| r.resource_version.clone())
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "ConfigMap".into(),
                name: resource.key.to_string(),
            })?;
        if current != resource.resource_version {
            return Err(Self::conflict(&resource.key, "resourceVersion mismatch"));
        }
        let mut stored = resource.clone();
        stored.resource_version = Some(state.bump());
        state.objects.insert(stored.key.clone(), stored);
        state.writes += 1;
        Ok(())
    }
}

// =============================================================================
// Identity Source
// =============================================================================

pub struct StaticIdentity {
    identity: Option<String>,
}

impl StaticIdentity {
    pub fn ok(identity: &str) -> Self {
        Self {
            identity: Some(identity.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { identity: None }
    }
}

#[async_trait]
impl IdentitySource for StaticIdentity {
    async fn get(&self, singleton: &str) -> Result<String> {
        self.identity
            .clone()
            .ok_or_else(|| Error::IdentityLookup(format!("clusterversions/{} not found", singleton)))
    }
}

// =============================================================================
// Process Registry
// =============================================================================

#[derive(Default)]
struct RegistryState {
    processes: Vec<(ProcessRef, BTreeMap<String, String>)>,
    terminated: Vec<ProcessRef>,
    fail_list: bool,
    fail_terminate_after: Option<usize>,
}

#[derive(Default)]
pub struct FakeProcessRegistry {
    state: RwLock<RegistryState>,
}

impl FakeProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, namespace: &str, name: &str, labels: &[(&str, &str)]) {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let process = ProcessRef {
            namespace: namespace.into(),
            name: name.into(),
        };
        self.state.write().await.processes.push((process, labels));
    }

    pub async fn terminated(&self) -> Vec<ProcessRef> {
        self.state.read().await.terminated.clone()
    }

    pub async fn fail_list(&self, fail: bool) {
        self.state.write().await.fail_list = fail;
    }

    /// Let `n` terminations succeed, then fail every later one
    pub async fn fail_terminate_after(&self, n: usize) {
        self.state.write().await.fail_terminate_after = Some(n);
    }
}

#[async_trait]
impl ProcessRegistry for FakeProcessRegistry {
    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<ProcessRef>> {
        let state = self.state.read().await;
        if state.fail_list {
            return Err(Error::ProcessRegistry("list refused".into()));
        }
        Ok(state
            .processes
            .iter()
            .filter(|(p, labels)| p.namespace == namespace && selector.matches(labels))
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn terminate(&self, process: &ProcessRef) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(limit) = state.fail_terminate_after {
            if state.terminated.len() >= limit {
                return Err(Error::ProcessRegistry(format!("delete {} refused", process)));
            }
        }
        state.processes.retain(|(p, _)| p != process);
        state.terminated.push(process.clone());
        Ok(())
    }
}
