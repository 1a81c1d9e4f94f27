//! Object store access for the derived site objects.
//!
//! `ObjectStore` is the seam between provisioning and the cluster: the
//! provisioner only sees tagged results, and `KubeObjectStore` translates
//! API server responses into them. A create that collides with an existing
//! object comes back as `Applied::AlreadyExists` instead of an error.

use k8s_openapi::api::core::v1::{ConfigMap, Pod, Service};
use kube::api::PostParams;
use kube::{Api, Client};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Status reason the API server reports for a create on an existing name
pub const REASON_ALREADY_EXISTS: &str = "AlreadyExists";

/// Kinds of objects the controller writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    ConfigMap,
    Pod,
    Service,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::ConfigMap => "ConfigMap",
            Self::Pod => "Pod",
            Self::Service => "Service",
        };
        f.write_str(kind)
    }
}

/// Successful outcome of a create call
#[derive(Debug, Clone, PartialEq)]
pub enum Applied<T> {
    /// The object was created; carries the server's copy
    Created(T),
    /// An object with this name already exists
    AlreadyExists,
}

/// Object store failure other than "already exists"
#[derive(Debug, Error)]
pub enum StoreError {
    /// The API server rejected the request
    #[error("{reason} ({code}): {message}")]
    Api {
        code: u16,
        reason: String,
        message: String,
    },

    /// The request never produced an API status (transport, serialization, auth)
    #[error("{0}")]
    Client(#[source] kube::Error),
}

impl StoreError {
    /// Whether the API server reported the object as already existing.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Api { reason, .. } if reason == REASON_ALREADY_EXISTS)
    }
}

impl From<kube::Error> for StoreError {
    fn from(error: kube::Error) -> Self {
        match error {
            kube::Error::Api(status) => Self::Api {
                code: status.code,
                reason: status.reason.clone(),
                message: status.message.clone(),
            },
            other => Self::Client(other),
        }
    }
}

/// Folds an "already exists" failure into the success branch.
fn created_or_existing<T>(result: Result<T, kube::Error>) -> Result<Applied<T>, StoreError> {
    match result {
        Ok(object) => Ok(Applied::Created(object)),
        Err(e) => {
            let error = StoreError::from(e);
            if error.is_already_exists() {
                Ok(Applied::AlreadyExists)
            } else {
                Err(error)
            }
        }
    }
}

/// Typed create/replace operations against one namespace.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Namespace every call is scoped to
    fn namespace(&self) -> &str;

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<Applied<ConfigMap>, StoreError>;
    async fn replace_config_map(&self, name: &str, config_map: &ConfigMap) -> Result<ConfigMap, StoreError>;
    async fn create_pod(&self, pod: &Pod) -> Result<Applied<Pod>, StoreError>;
    async fn create_service(&self, service: &Service) -> Result<Applied<Service>, StoreError>;
}

/// `ObjectStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeObjectStore {
    namespace: String,
    config_maps: Api<ConfigMap>,
    pods: Api<Pod>,
    services: Api<Service>,
}

impl KubeObjectStore {
    /// Creates a store writing into `namespace`.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            config_maps: Api::namespaced(client.clone(), namespace),
            pods: Api::namespaced(client.clone(), namespace),
            services: Api::namespaced(client, namespace),
        }
    }
}

impl fmt::Debug for KubeObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeObjectStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeObjectStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<Applied<ConfigMap>, StoreError> {
        debug!("POST ConfigMap {:?} in {}", config_map.metadata.name, self.namespace);
        created_or_existing(self.config_maps.create(&PostParams::default(), config_map).await)
    }

    async fn replace_config_map(&self, name: &str, config_map: &ConfigMap) -> Result<ConfigMap, StoreError> {
        // No resourceVersion is sent: ConfigMaps accept unconditional replaces.
        debug!("PUT ConfigMap {} in {}", name, self.namespace);
        self.config_maps
            .replace(name, &PostParams::default(), config_map)
            .await
            .map_err(StoreError::from)
    }

    async fn create_pod(&self, pod: &Pod) -> Result<Applied<Pod>, StoreError> {
        debug!("POST Pod {:?} in {}", pod.metadata.name, self.namespace);
        created_or_existing(self.pods.create(&PostParams::default(), pod).await)
    }

    async fn create_service(&self, service: &Service) -> Result<Applied<Service>, StoreError> {
        debug!("POST Service {:?} in {}", service.metadata.name, self.namespace);
        created_or_existing(self.services.create(&PostParams::default(), service).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16, reason: &str) -> StoreError {
        StoreError::Api {
            code,
            reason: reason.to_string(),
            message: format!("{} happened", reason),
        }
    }

    fn kube_api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} happened", reason),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_create_collision_becomes_already_exists() {
        let result: Result<Applied<ConfigMap>, StoreError> =
            created_or_existing(Err(kube_api_error(409, "AlreadyExists")));
        assert_eq!(result.unwrap(), Applied::AlreadyExists);
    }

    #[test]
    fn test_create_success_carries_server_copy() {
        let pod = Pod::default();
        let result = created_or_existing::<Pod>(Ok(pod.clone()));
        assert_eq!(result.unwrap(), Applied::Created(pod));
    }

    #[test]
    fn test_other_api_failures_stay_errors() {
        for (code, reason) in [(409, "Conflict"), (403, "Forbidden")] {
            let err = created_or_existing::<Service>(Err(kube_api_error(code, reason))).unwrap_err();
            match err {
                StoreError::Api {
                    code: got_code,
                    reason: got_reason,
                    message,
                } => {
                    assert_eq!(got_code, code);
                    assert_eq!(got_reason, reason);
                    assert_eq!(message, format!("{} happened", reason));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_non_api_failure_becomes_client_error() {
        let err = created_or_existing::<Pod>(Err(kube::Error::LinesCodecMaxLineLengthExceeded))
            .unwrap_err();
        assert!(matches!(err, StoreError::Client(_)));
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_already_exists_is_classified_by_reason() {
        assert!(api_error(409, "AlreadyExists").is_already_exists());
        // 409 is also used for update conflicts, which are not "already exists"
        assert!(!api_error(409, "Conflict").is_already_exists());
        assert!(!api_error(403, "Forbidden").is_already_exists());
    }

    #[test]
    fn test_store_error_display_names_reason_and_code() {
        let error = api_error(403, "Forbidden");
        assert_eq!(error.to_string(), "Forbidden (403): Forbidden happened");
    }

    #[test]
    fn test_object_kind_display() {
        assert_eq!(ObjectKind::ConfigMap.to_string(), "ConfigMap");
        assert_eq!(ObjectKind::Pod.to_string(), "Pod");
        assert_eq!(ObjectKind::Service.to_string(), "Service");
    }
}
