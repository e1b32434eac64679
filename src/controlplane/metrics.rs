//! Reconciliation metrics
//!
//! Counters are registered against a caller-supplied registry so the
//! binary can expose them and tests can use a throwaway one.

use crate::error::{Error, Result};
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

/// Prometheus counters for reconciliation passes
#[derive(Clone)]
pub struct ReconcileMetrics {
    /// Passes by outcome: changed, unchanged, error
    pub passes: IntCounterVec,
    /// Pods deleted to pick up new config
    pub pods_restarted: IntCounter,
    /// Restart attempts cut short by a registry failure
    pub restarts_aborted: IntCounter,
    /// Duration of whole passes
    pub pass_duration: Histogram,
}

impl ReconcileMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let passes = IntCounterVec::new(
            Opts::new(
                "operator_config_reconcile_passes_total",
                "Reconciliation passes by outcome",
            ),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let pods_restarted = IntCounter::new(
            "operator_config_dependent_pods_restarted_total",
            "Dependent pods deleted to pick up new config",
        )
        .map_err(metrics_error)?;
        let restarts_aborted = IntCounter::new(
            "operator_config_dependent_restarts_aborted_total",
            "Dependent restarts stopped early by a registry failure",
        )
        .map_err(metrics_error)?;
        let pass_duration = Histogram::with_opts(HistogramOpts::new(
            "operator_config_reconcile_duration_seconds",
            "Duration of reconciliation passes",
        ))
        .map_err(metrics_error)?;

        registry
            .register(Box::new(passes.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(pods_restarted.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(restarts_aborted.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(pass_duration.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            passes,
            pods_restarted,
            restarts_aborted,
            pass_duration,
        })
    }

    pub fn record_pass(&self, outcome: &str) {
        self.passes.with_label_values(&[outcome]).inc();
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics registration failed: {}", e))
}
