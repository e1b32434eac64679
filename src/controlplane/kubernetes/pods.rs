//! Pod-backed process registry

use crate::domain::ports::{LabelSelector, ProcessRef, ProcessRegistry};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams};
use kube::{Client, ResourceExt};
use tracing::debug;

/// Lists and deletes pods through the API server
#[derive(Clone)]
pub struct KubePodRegistry {
    client: Client,
}

impl KubePodRegistry {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProcessRegistry for KubePodRegistry {
    async fn list(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<ProcessRef>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(&selector.to_string()))
            .await?;

        Ok(pods
            .items
            .iter()
            .map(|pod| ProcessRef {
                namespace: pod.namespace().unwrap_or_else(|| namespace.to_string()),
                name: pod.name_any(),
            })
            .collect())
    }

    async fn terminate(&self, process: &ProcessRef) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &process.namespace);
        match api.delete(&process.name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            // Already gone counts as restarted
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(pod = %process, "Pod already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
