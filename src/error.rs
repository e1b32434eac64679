//! Error types for the Storage Config Operator
//!
//! Errors here are the fatal-to-pass kind. Best-effort lookups (cluster
//! identity, failure domain) and dependent pod restarts log and degrade
//! instead of returning one of these.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    #[error("Resource already exists: {kind}/{name}")]
    ResourceExists { kind: String, name: String },

    #[error("Update conflict on {kind}/{name}: {reason}")]
    Conflict {
        kind: String,
        name: String,
        reason: String,
    },

    // =========================================================================
    // Ownership Errors
    // =========================================================================
    #[error("{resource} is already controlled by {owner_kind}/{owner_name}")]
    AlreadyOwned {
        resource: String,
        owner_kind: String,
        owner_name: String,
    },

    // =========================================================================
    // Dependency Errors
    // =========================================================================
    #[error("Identity lookup failed: {0}")]
    IdentityLookup(String),

    #[error("Process registry error: {0}")]
    ProcessRegistry(String),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Label selector parse error: {0}")]
    SelectorParse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Kube(_) | Error::Conflict { .. } | Error::ResourceExists { .. } => {
                ErrorAction::RequeueWithBackoff
            }

            // Someone else owns the config map; an operator has to step in
            Error::AlreadyOwned { .. } => ErrorAction::RequeueAfter(Duration::from_secs(300)),

            // Configuration/validation errors - don't retry automatically
            Error::Configuration(_) | Error::SelectorParse(_) => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;
