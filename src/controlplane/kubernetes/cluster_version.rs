//! Cluster identity from the OpenShift ClusterVersion singleton
//!
//! ClusterVersion is not part of k8s-openapi, so it is read as a
//! DynamicObject and only `spec.clusterID` is extracted.

use crate::domain::ports::IdentitySource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, GroupVersionKind};
use kube::discovery::ApiResource;
use kube::Client;

/// Reads `spec.clusterID` from `clusterversions.config.openshift.io`
#[derive(Clone)]
pub struct ClusterVersionIdentity {
    client: Client,
    resource: ApiResource,
}

impl ClusterVersionIdentity {
    pub fn new(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk("config.openshift.io", "v1", "ClusterVersion");
        Self {
            client,
            resource: ApiResource::from_gvk_with_plural(&gvk, "clusterversions"),
        }
    }
}

#[async_trait]
impl IdentitySource for ClusterVersionIdentity {
    async fn get(&self, singleton: &str) -> Result<String> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &self.resource);
        let version = api.get(singleton).await?;
        cluster_id(&version.data)
            .ok_or_else(|| Error::IdentityLookup(format!("clusterversions/{} has no spec.clusterID", singleton)))
    }
}

fn cluster_id(data: &serde_json::Value) -> Option<String> {
    data.get("spec")?
        .get("clusterID")?
        .as_str()
        .map(str::to_string)
}
