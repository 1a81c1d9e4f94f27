//! Provisioning of a site's derived objects.
//!
//! Objects are ensured strictly in order ConfigMap, Pod, Service: the Pod
//! mounts the ConfigMap and the Service selects the Pod's label. The first
//! failure stops the pipeline and earlier objects are left in place.
//!
//! Idempotence per kind:
//! - ConfigMap: created, or replaced with the new content when it exists
//! - Pod: created, or left untouched when it exists
//! - Service: created, or left untouched when it exists

use crate::error::ControllerError;
use crate::resources::{build_config_map, build_pod, build_service, html_config_map_name, pod_name, service_name};
use crate::store::{Applied, ObjectKind, ObjectStore, StoreError};
use chrono::Utc;
use site_fetcher::SiteContent;
use std::sync::Arc;
use tracing::{debug, info};

/// What happened to one derived object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    /// Existing object refreshed with new content
    Replaced,
    /// Existing object left as it was
    Unchanged,
}

/// Outcome of a full provisioning run for one site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteResourceSet {
    pub config_map: Provisioned,
    pub pod: Provisioned,
    pub service: Provisioned,
}

/// Ensures the ConfigMap, Pod and Service of a site exist.
#[derive(Clone)]
pub struct ResourceProvisioner {
    store: Arc<dyn ObjectStore>,
    server_image: String,
}

impl ResourceProvisioner {
    /// Creates a provisioner writing through `store`.
    pub fn new(store: Arc<dyn ObjectStore>, server_image: impl Into<String>) -> Self {
        Self {
            store,
            server_image: server_image.into(),
        }
    }

    /// Ensures all three objects for `site`, in order.
    pub async fn apply(&self, site: &str, content: &SiteContent) -> Result<SiteResourceSet, ControllerError> {
        let config_map = self.ensure_config_map(site, content).await?;
        let pod = self.ensure_pod(site).await?;
        let service = self.ensure_service(site).await?;

        Ok(SiteResourceSet {
            config_map,
            pod,
            service,
        })
    }

    /// Creates `{site}-html`, replacing its content if it already exists.
    pub async fn ensure_config_map(&self, site: &str, content: &SiteContent) -> Result<Provisioned, ControllerError> {
        let name = html_config_map_name(site);
        let config_map = build_config_map(site, content, Utc::now());

        let created = self
            .store
            .create_config_map(&config_map)
            .await
            .map_err(|e| failed(ObjectKind::ConfigMap, &name, "creating", e))?;

        match created {
            Applied::Created(created) => {
                debug!("ConfigMap {} uid {:?}", name, created.metadata.uid);
                info!("Created ConfigMap {}/{}", self.store.namespace(), name);
                Ok(Provisioned::Created)
            }
            Applied::AlreadyExists => {
                self.store
                    .replace_config_map(&name, &config_map)
                    .await
                    .map_err(|e| failed(ObjectKind::ConfigMap, &name, "replacing", e))?;
                info!("Updated existing ConfigMap {}/{}", self.store.namespace(), name);
                Ok(Provisioned::Replaced)
            }
        }
    }

    /// Creates `{site}-pod` unless a Pod of that name already exists.
    pub async fn ensure_pod(&self, site: &str) -> Result<Provisioned, ControllerError> {
        let name = pod_name(site);
        let pod = build_pod(site, &self.server_image);

        match self
            .store
            .create_pod(&pod)
            .await
            .map_err(|e| failed(ObjectKind::Pod, &name, "creating", e))?
        {
            Applied::Created(created) => {
                debug!("Pod {} uid {:?}", name, created.metadata.uid);
                info!("Created Pod {}/{}", self.store.namespace(), name);
                Ok(Provisioned::Created)
            }
            Applied::AlreadyExists => {
                info!("Pod {}/{} already exists, skipping creation", self.store.namespace(), name);
                Ok(Provisioned::Unchanged)
            }
        }
    }

    /// Creates `{site}-service` unless a Service of that name already exists.
    pub async fn ensure_service(&self, site: &str) -> Result<Provisioned, ControllerError> {
        let name = service_name(site);
        let service = build_service(site);

        match self
            .store
            .create_service(&service)
            .await
            .map_err(|e| failed(ObjectKind::Service, &name, "creating", e))?
        {
            Applied::Created(created) => {
                debug!("Service {} uid {:?}", name, created.metadata.uid);
                info!("Created Service {}/{}", self.store.namespace(), name);
                Ok(Provisioned::Created)
            }
            Applied::AlreadyExists => {
                info!("Service {}/{} already exists, skipping creation", self.store.namespace(), name);
                Ok(Provisioned::Unchanged)
            }
        }
    }
}

/// Wraps a store failure; the caller logs it once with the site name.
fn failed(kind: ObjectKind, name: &str, action: &'static str, source: StoreError) -> ControllerError {
    ControllerError::Provision {
        action,
        kind,
        name: name.to_string(),
        source,
    }
}

#[cfg(test)]
#[path = "provisioner_test.rs"]
mod provisioner_test;
