//! Main Orchestrator
//!
//! Runs one reconciliation pass for a StorageCluster:
//! - Resolve the cluster identity and failure-domain label (best effort)
//! - Derive the managed config values
//! - Converge the operator config map
//! - Restart dependent pods, only if the config map changed

use super::config_reconciler::ConfigReconciler;
use super::derivation::{derive, DerivedConfig};
use super::identity::{IdentityResolver, DEFAULT_IDENTITY_SINGLETON};
use super::metrics::ReconcileMetrics;
use super::restart::{RestartController, RestartReport, DEFAULT_DEPENDENT_LABEL};
use crate::crd::StorageCluster;
use crate::domain::ports::{
    ConfigMapStoreRef, FailureDomainLookupRef, IdentitySourceRef, LabelSelector, OwnerIdentity,
    ProcessRegistryRef, ResourceKey,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use kube::{Resource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Default name of the operator config map
pub const DEFAULT_CONFIG_MAP_NAME: &str = "ocs-operator-config";

/// Default namespace for clusters that carry none
pub const DEFAULT_NAMESPACE: &str = "openshift-storage";

// =============================================================================
// Operator Configuration
// =============================================================================

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Name of the managed config map
    pub config_map_name: String,
    /// Namespace used when a StorageCluster has none
    pub default_namespace: String,
    /// Selects pods that consume the config map
    pub dependent_selector: LabelSelector,
    /// Name of the identity singleton object
    pub identity_singleton: String,
    /// Periodic resync interval in seconds
    pub resync_interval_secs: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            config_map_name: DEFAULT_CONFIG_MAP_NAME.to_string(),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            dependent_selector: LabelSelector::single(
                DEFAULT_DEPENDENT_LABEL.0,
                DEFAULT_DEPENDENT_LABEL.1,
            ),
            identity_singleton: DEFAULT_IDENTITY_SINGLETON.to_string(),
            resync_interval_secs: 300,
        }
    }
}

// =============================================================================
// Pass Outcome
// =============================================================================

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutcome {
    /// Values the config map was converged to
    pub derived: DerivedConfig,
    /// Whether the config map was created or updated
    pub changed: bool,
    /// Present only when dependents were restarted
    pub restart: Option<RestartReport>,
    pub completed_at: DateTime<Utc>,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Coordinates the components of a reconciliation pass
pub struct Orchestrator {
    config: OperatorConfig,
    identity: IdentityResolver,
    failure_domain: FailureDomainLookupRef,
    reconciler: ConfigReconciler,
    restarter: RestartController,
    metrics: Option<ReconcileMetrics>,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(
        config: OperatorConfig,
        store: ConfigMapStoreRef,
        identity_source: IdentitySourceRef,
        registry: ProcessRegistryRef,
        failure_domain: FailureDomainLookupRef,
    ) -> Self {
        let identity = IdentityResolver::new(identity_source, config.identity_singleton.clone());

        Self {
            config,
            identity,
            failure_domain,
            reconciler: ConfigReconciler::new(store),
            restarter: RestartController::new(registry),
            metrics: None,
        }
    }

    /// Record pass outcomes into `metrics`
    pub fn with_metrics(mut self, metrics: ReconcileMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Config map key for a cluster
    pub fn target_for(&self, cluster: &StorageCluster) -> ResourceKey {
        ResourceKey::new(
            self.config.config_map_name.clone(),
            cluster.namespace_or(&self.config.default_namespace),
        )
    }

    /// Run one derive → merge → restart pass for `cluster`
    #[instrument(skip(self, cluster), fields(storage_cluster = %cluster.name_any()))]
    pub async fn run_pass(&self, cluster: &StorageCluster) -> Result<PassOutcome> {
        let started = Instant::now();
        let result = self.run_pass_inner(cluster).await;

        if let Some(metrics) = &self.metrics {
            metrics
                .pass_duration
                .observe(started.elapsed().as_secs_f64());
            match &result {
                Ok(outcome) => {
                    metrics.record_pass(if outcome.changed { "changed" } else { "unchanged" });
                    if let Some(report) = &outcome.restart {
                        metrics.pods_restarted.inc_by(report.terminated as u64);
                        if report.aborted {
                            metrics.restarts_aborted.inc();
                        }
                    }
                }
                Err(_) => metrics.record_pass("error"),
            }
        }

        result
    }

    async fn run_pass_inner(&self, cluster: &StorageCluster) -> Result<PassOutcome> {
        let owner = owner_identity(cluster)?;
        let target = self.target_for(cluster);

        let identity = self.identity.resolve().await;
        let domain_label = self.failure_domain.lookup(cluster);
        let derived = derive(&cluster.spec, &identity, &domain_label);
        debug!(config_map = %target, ?derived, "Derived operator config");

        let changed = self.reconciler.reconcile(&derived, &target, &owner).await?;

        let restart = if changed {
            let report = self
                .restarter
                .restart_dependents(&target.namespace, &self.config.dependent_selector)
                .await;
            if report.incomplete() {
                warn!(
                    config_map = %target,
                    listed = report.listed,
                    restarted = report.terminated,
                    aborted = report.aborted,
                    "Operator config updated, but dependent pods were not all restarted"
                );
            } else {
                info!(
                    config_map = %target,
                    restarted = report.terminated,
                    "Operator config updated, dependent pods restarted to pick up new values"
                );
            }
            Some(report)
        } else {
            None
        };

        Ok(PassOutcome {
            derived,
            changed,
            restart,
            completed_at: Utc::now(),
        })
    }
}

/// Owner reference target for a StorageCluster
pub fn owner_identity(cluster: &StorageCluster) -> Result<OwnerIdentity> {
    let uid = cluster.uid().ok_or_else(|| {
        Error::Internal(format!(
            "StorageCluster {} has no uid; it must be read from the API server",
            cluster.name_any()
        ))
    })?;

    Ok(OwnerIdentity {
        api_version: StorageCluster::api_version(&()).to_string(),
        kind: StorageCluster::kind(&()).to_string(),
        name: cluster.name_any(),
        uid,
    })
}
