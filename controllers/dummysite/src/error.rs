//! Controller-specific error types.
//!
//! This module defines error types specific to the DummySite Controller
//! that are not covered by upstream library errors.

use crate::store::{ObjectKind, StoreError};
use kube::Error as KubeError;
use site_fetcher::FetchError;
use thiserror::Error;

/// Errors that can occur in the DummySite Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Site content could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A derived object could not be created or replaced
    #[error("Failed {action} {kind} {name}: {source}")]
    Provision {
        action: &'static str,
        kind: ObjectKind,
        name: String,
        #[source]
        source: StoreError,
    },

    /// DummySite event rejected before any work was done
    #[error("Invalid DummySite: {0}")]
    InvalidSite(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// The resume point of the watch is too old and must be dropped
    #[error("Resource watch expired: {0}")]
    WatchExpired(String),
}
