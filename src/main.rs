//! Storage Config Operator
//!
//! Watches StorageCluster objects and keeps the CSI operator config map
//! converged, restarting the rook-ceph operator when the config changes.

use clap::Parser;
use kube::CustomResourceExt;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storage_config_operator::controlplane::controller;
use storage_config_operator::{
    Error, KubeAdapters, LabelSelector, OperatorConfig, Orchestrator, ReconcileMetrics, Result,
    StatusFailureDomain, StorageCluster,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Storage Config Operator - CSI operator config reconciler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Namespace to watch (all namespaces if unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Name of the managed operator config map
    #[arg(long, env = "OPERATOR_CONFIG_NAME", default_value = "ocs-operator-config")]
    config_map_name: String,

    /// Namespace assumed for StorageClusters without one
    #[arg(long, env = "DEFAULT_NAMESPACE", default_value = "openshift-storage")]
    default_namespace: String,

    /// Label selector of pods restarted when the config changes
    #[arg(long, env = "DEPENDENT_SELECTOR", default_value = "app=rook-ceph-operator")]
    dependent_selector: String,

    /// Name of the ClusterVersion singleton holding the cluster ID
    #[arg(long, env = "CLUSTER_VERSION_NAME", default_value = "version")]
    cluster_version_name: String,

    /// Resync interval in seconds
    #[arg(long, env = "RESYNC_INTERVAL", default_value = "300")]
    resync_interval_secs: u64,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Print the StorageCluster CRD as YAML and exit
    #[arg(long)]
    print_crd: bool,
}

impl Args {
    fn operator_config(&self) -> Result<OperatorConfig> {
        Ok(OperatorConfig {
            config_map_name: self.config_map_name.clone(),
            default_namespace: self.default_namespace.clone(),
            dependent_selector: LabelSelector::parse(&self.dependent_selector)?,
            identity_singleton: self.cluster_version_name.clone(),
            resync_interval_secs: self.resync_interval_secs,
        })
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_crd {
        print!("{}", serde_yaml::to_string(&StorageCluster::crd())?);
        return Ok(());
    }

    // Initialize logging
    init_logging(&args);

    let config = args.operator_config()?;

    info!("Starting Storage Config Operator");
    info!("  Version: {}", storage_config_operator::VERSION);
    info!("  Config map: {}", config.config_map_name);
    info!("  Dependent selector: {}", config.dependent_selector);
    info!("  Resync interval: {}s", config.resync_interval_secs);

    let client = kube::Client::try_default().await?;
    let adapters = KubeAdapters::new(client.clone());

    let registry = Registry::new();
    let metrics = ReconcileMetrics::new(&registry)?;

    let orchestrator = Arc::new(
        Orchestrator::new(
            config,
            adapters.config_maps,
            adapters.identity,
            adapters.pods,
            Arc::new(StatusFailureDomain),
        )
        .with_metrics(metrics),
    );

    // Start health server
    let health_addr = args.health_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr, registry).await {
            error!("Metrics server error: {}", e);
        }
    });

    controller::run(client, orchestrator, args.namespace.clone()).await;

    info!("Operator shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

async fn run_health_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let (status, body) = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => (StatusCode::OK, "ok"),
                _ => (StatusCode::NOT_FOUND, "not found"),
            };
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid health server address: {}", e))
    })?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, registry: Registry) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    let make_svc = make_service_fn(move |_conn| {
        let registry = registry.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                async move {
                    let mut response = match req.uri().path() {
                        "/metrics" => {
                            let encoder = TextEncoder::new();
                            let mut buffer = Vec::new();
                            match encoder.encode(&registry.gather(), &mut buffer) {
                                Ok(()) => {
                                    let mut ok = Response::new(Body::from(buffer));
                                    if let Ok(value) = encoder.format_type().parse() {
                                        ok.headers_mut().insert("Content-Type", value);
                                    }
                                    ok
                                }
                                Err(e) => {
                                    let mut failed = Response::new(Body::from(e.to_string()));
                                    *failed.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                    failed
                                }
                            }
                        }
                        _ => {
                            let mut missing = Response::new(Body::from("not found"));
                            *missing.status_mut() = StatusCode::NOT_FOUND;
                            missing
                        }
                    };
                    response.headers_mut().insert(
                        "Cache-Control",
                        hyper::header::HeaderValue::from_static("no-store"),
                    );
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    let addr: SocketAddr = addr.parse().map_err(|e| {
        Error::Configuration(format!("Invalid metrics server address: {}", e))
    })?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
