//! StorageCluster controller
//!
//! Watches StorageCluster objects (and the ConfigMaps they own) and runs a
//! reconciliation pass per object. The runtime serializes passes for the
//! same object, so a config map is never merged concurrently.

use super::orchestrator::Orchestrator;
use crate::crd::StorageCluster;
use crate::error::{Error, ErrorAction, Result};
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::{watcher, Controller};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Requeue delay for errors that ask for backoff
const BACKOFF_REQUEUE: Duration = Duration::from_secs(15);

/// Shared state handed to every reconcile call
pub struct Context {
    pub orchestrator: Arc<Orchestrator>,
}

/// Reconcile one StorageCluster
pub async fn reconcile(cluster: Arc<StorageCluster>, ctx: Arc<Context>) -> Result<Action> {
    if cluster.metadata.deletion_timestamp.is_some() {
        // Owner references cascade the config map; nothing to do
        debug!(storage_cluster = %cluster.name_any(), "StorageCluster is being deleted");
        return Ok(Action::await_change());
    }

    ctx.orchestrator.run_pass(&cluster).await?;

    Ok(Action::requeue(Duration::from_secs(
        ctx.orchestrator.config().resync_interval_secs,
    )))
}

/// Decide when a failed StorageCluster is retried
pub fn error_policy(cluster: Arc<StorageCluster>, error: &Error, _ctx: Arc<Context>) -> Action {
    warn!(
        storage_cluster = %cluster.name_any(),
        error = %error,
        "Reconciliation failed"
    );
    action_for(error)
}

/// Map an error to a requeue action
pub fn action_for(error: &Error) -> Action {
    match error.action() {
        ErrorAction::RequeueWithBackoff => Action::requeue(BACKOFF_REQUEUE),
        ErrorAction::RequeueAfter(delay) => Action::requeue(delay),
        ErrorAction::NoRequeue => Action::await_change(),
    }
}

/// Run the controller until a shutdown signal arrives
///
/// `namespace` restricts the watch; `None` watches all namespaces.
pub async fn run(client: Client, orchestrator: Arc<Orchestrator>, namespace: Option<String>) {
    let (clusters, config_maps): (Api<StorageCluster>, Api<ConfigMap>) = match &namespace {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client, ns),
        ),
        None => (Api::all(client.clone()), Api::all(client)),
    };

    info!(
        namespace = namespace.as_deref().unwrap_or("<all>"),
        "Starting StorageCluster controller"
    );

    Controller::new(clusters, watcher::Config::default())
        .owns(config_maps, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, Arc::new(Context { orchestrator }))
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(object = %object, "Reconciled"),
                Err(e) => warn!(error = %e, "Controller error"),
            }
        })
        .await;

    info!("StorageCluster controller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_for_errors() {
        let conflict = Error::Conflict {
            kind: "ConfigMap".into(),
            name: "openshift-storage/ocs-operator-config".into(),
            reason: "stale".into(),
        };
        assert_eq!(action_for(&conflict), Action::requeue(BACKOFF_REQUEUE));

        let owned = Error::AlreadyOwned {
            resource: "ConfigMap/openshift-storage/ocs-operator-config".into(),
            owner_kind: "StorageCluster".into(),
            owner_name: "other".into(),
        };
        assert_eq!(action_for(&owned), Action::requeue(Duration::from_secs(300)));

        let bad = Error::SelectorParse("app".into());
        assert_eq!(action_for(&bad), Action::await_change());
    }
}
