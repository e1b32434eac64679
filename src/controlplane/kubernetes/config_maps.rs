//! ConfigMap store backed by the Kubernetes API

use crate::domain::ports::{ConfigMapStore, ConfigResource, OwnerIdentity, OwnerRef, ResourceKey};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::debug;

/// Reads and writes ConfigMaps through the API server
#[derive(Clone)]
pub struct KubeConfigMapStore {
    client: Client,
}

impl KubeConfigMapStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ConfigMapStore for KubeConfigMapStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<ConfigResource>> {
        let cm = self.api(&key.namespace).get_opt(&key.name).await?;
        Ok(cm.map(|cm| from_config_map(key, &cm)))
    }

    async fn create(&self, resource: &ConfigResource) -> Result<()> {
        let key = &resource.key;
        let cm = to_config_map(resource);

        match self.api(&key.namespace).create(&PostParams::default(), &cm).await {
            Ok(_) => {
                debug!(config_map = %key, "Created ConfigMap");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::ResourceExists {
                kind: "ConfigMap".into(),
                name: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, resource: &ConfigResource) -> Result<()> {
        let key = &resource.key;
        let patch = replace_patch(resource);

        match self
            .api(&key.namespace)
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => {
                debug!(config_map = %key, "Updated ConfigMap");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::Conflict {
                kind: "ConfigMap".into(),
                name: key.to_string(),
                reason: ae.message,
            }),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Err(Error::ResourceNotFound {
                kind: "ConfigMap".into(),
                name: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// JSON merge patch for [`KubeConfigMapStore::replace`]
///
/// `resourceVersion` makes the API server reject stale writes. `data` only
/// carries keys to set, so keys written by others survive the merge.
fn replace_patch(resource: &ConfigResource) -> serde_json::Value {
    let owner_references: Vec<OwnerReference> =
        resource.owner_references.iter().map(to_owner_reference).collect();

    serde_json::json!({
        "metadata": {
            "resourceVersion": resource.resource_version,
            "ownerReferences": owner_references,
        },
        "data": resource.data,
    })
}

fn from_config_map(key: &ResourceKey, cm: &ConfigMap) -> ConfigResource {
    ConfigResource {
        key: key.clone(),
        data: cm.data.clone().unwrap_or_default(),
        owner_references: cm
            .metadata
            .owner_references
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(from_owner_reference)
            .collect(),
        resource_version: cm.metadata.resource_version.clone(),
    }
}

fn to_config_map(resource: &ConfigResource) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(resource.key.name.clone()),
            namespace: Some(resource.key.namespace.clone()),
            owner_references: Some(
                resource
                    .owner_references
                    .iter()
                    .map(to_owner_reference)
                    .collect(),
            ),
            ..Default::default()
        },
        data: Some(resource.data.clone()),
        ..Default::default()
    }
}

fn from_owner_reference(r: &OwnerReference) -> OwnerRef {
    OwnerRef {
        owner: OwnerIdentity {
            api_version: r.api_version.clone(),
            kind: r.kind.clone(),
            name: r.name.clone(),
            uid: r.uid.clone(),
        },
        controller: r.controller,
        block_owner_deletion: r.block_owner_deletion,
    }
}

fn to_owner_reference(r: &OwnerRef) -> OwnerReference {
    OwnerReference {
        api_version: r.owner.api_version.clone(),
        kind: r.owner.kind.clone(),
        name: r.owner.name.clone(),
        uid: r.owner.uid.clone(),
        controller: r.controller,
        block_owner_deletion: r.block_owner_deletion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_config_map_conversion() {
        let key = ResourceKey::new("ocs-operator-config", "openshift-storage");
        let mut data = BTreeMap::new();
        data.insert("CSI_ENABLE_TOPOLOGY".to_string(), "false".to_string());

        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some(key.name.clone()),
                namespace: Some(key.namespace.clone()),
                resource_version: Some("42".into()),
                owner_references: Some(vec![OwnerReference {
                    api_version: "ocs.openshift.io/v1".into(),
                    kind: "OCSInitialization".into(),
                    name: "ocsinit".into(),
                    uid: "u-1".into(),
                    controller: Some(true),
                    block_owner_deletion: Some(true),
                }]),
                ..Default::default()
            },
            data: Some(data.clone()),
            ..Default::default()
        };

        let resource = from_config_map(&key, &cm);
        assert_eq!(resource.data, data);
        assert_eq!(resource.resource_version.as_deref(), Some("42"));
        assert_eq!(resource.controller().unwrap().owner.kind, "OCSInitialization");

        let back = to_config_map(&resource);
        assert_eq!(back.data, cm.data);
        assert_eq!(back.metadata.owner_references, cm.metadata.owner_references);
        assert_eq!(back.metadata.resource_version, None);
    }

    #[test]
    fn test_replace_patch_carries_version_and_owners() {
        let key = ResourceKey::new("ocs-operator-config", "openshift-storage");
        let mut resource = ConfigResource::new(key);
        resource.resource_version = Some("1187".into());
        resource
            .data
            .insert("CSI_ENABLE_READ_AFFINITY".into(), "true".into());
        resource
            .data
            .insert("CSI_CLUSTER_NAME".into(), "cluster-a".into());
        resource.owner_references = vec![
            OwnerRef {
                owner: OwnerIdentity {
                    api_version: "ocs.openshift.io/v1".into(),
                    kind: "OCSInitialization".into(),
                    name: "ocsinit".into(),
                    uid: "u-1".into(),
                },
                controller: None,
                block_owner_deletion: None,
            },
            OwnerRef::controller_of(OwnerIdentity {
                api_version: "ocs.openshift.io/v1".into(),
                kind: "StorageCluster".into(),
                name: "ocs-storagecluster".into(),
                uid: "u-2".into(),
            }),
        ];

        let patch = replace_patch(&resource);

        assert_eq!(patch["metadata"]["resourceVersion"], "1187");
        assert_eq!(
            patch["data"],
            serde_json::json!({
                "CSI_CLUSTER_NAME": "cluster-a",
                "CSI_ENABLE_READ_AFFINITY": "true",
            })
        );

        let refs = patch["metadata"]["ownerReferences"].as_array().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0]["kind"], "OCSInitialization");
        assert!(refs[0].get("controller").is_none());
        assert!(refs[0].get("blockOwnerDeletion").is_none());
        assert_eq!(refs[1]["kind"], "StorageCluster");
        assert_eq!(refs[1]["uid"], "u-2");
        assert_eq!(refs[1]["controller"], true);
        assert_eq!(refs[1]["blockOwnerDeletion"], true);

        // Nothing in the patch may null out data keys written by others
        let mut top: Vec<&str> = patch.as_object().unwrap().keys().map(String::as_str).collect();
        top.sort_unstable();
        assert_eq!(top, vec!["data", "metadata"]);
        assert!(patch["data"]
            .as_object()
            .unwrap()
            .values()
            .all(|v| v.is_string()));
        assert!(patch.get("binaryData").is_none());
    }

    #[test]
    fn test_missing_data_is_empty() {
        let key = ResourceKey::new("ocs-operator-config", "openshift-storage");
        let resource = from_config_map(&key, &ConfigMap::default());
        assert!(resource.data.is_empty());
        assert!(resource.owner_references.is_empty());
    }
}
