//! Dependent-Workload Restart Controller
//!
//! Deletes the pods that consume the operator config so their owning
//! Deployment recreates them with the new values. Never fails the pass: a
//! stale dependent is preferable to a failed reconcile.

use crate::domain::ports::{LabelSelector, ProcessRegistryRef};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Selector used for the rook-ceph operator pods
pub const DEFAULT_DEPENDENT_LABEL: (&str, &str) = ("app", "rook-ceph-operator");

/// What a restart attempt did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartReport {
    /// Processes matched by the selector
    pub listed: usize,
    /// Processes a termination request succeeded for
    pub terminated: usize,
    /// True if listing or a termination failed and the rest were skipped
    pub aborted: bool,
}

impl RestartReport {
    /// True when dependents may still be running with the previous config
    pub fn incomplete(&self) -> bool {
        self.aborted || self.listed == 0
    }
}

/// Restarts workloads that consume the operator config
#[derive(Clone)]
pub struct RestartController {
    registry: ProcessRegistryRef,
}

impl RestartController {
    pub fn new(registry: ProcessRegistryRef) -> Self {
        Self { registry }
    }

    /// Terminate every process in `namespace` matching `selector`.
    ///
    /// Stops at the first failed termination; the next pass that changes the
    /// config retries the remainder.
    pub async fn restart_dependents(&self, namespace: &str, selector: &LabelSelector) -> RestartReport {
        let processes = match self.registry.list(namespace, selector).await {
            Ok(processes) => processes,
            Err(e) => {
                error!(
                    namespace = %namespace,
                    selector = %selector,
                    error = %e,
                    "Failed to list dependent pods"
                );
                return RestartReport {
                    aborted: true,
                    ..Default::default()
                };
            }
        };

        let mut report = RestartReport {
            listed: processes.len(),
            ..Default::default()
        };

        if processes.is_empty() {
            warn!(namespace = %namespace, selector = %selector, "No dependent pods to restart");
            return report;
        }

        for process in &processes {
            if let Err(e) = self.registry.terminate(process).await {
                error!(pod = %process, error = %e, "Failed to delete dependent pod");
                report.aborted = true;
                break;
            }
            info!(pod = %process, "Deleted dependent pod");
            report.terminated += 1;
        }

        report
    }
}
