//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the kube client,
//! the site fetcher, the provisioner and the watch loop together for the
//! DummySite Controller.

use crate::backoff::TokioSleeper;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::provisioner::ResourceProvisioner;
use crate::reconciler::SiteReconciler;
use crate::store::KubeObjectStore;
use crate::watcher::{KubeSiteEventSource, WatchLoop};
use crds::DummySite;
use kube::{Api, Client};
use site_fetcher::HttpSiteFetcher;
use std::sync::Arc;
use tracing::{info, warn};

/// Main controller for DummySite management.
pub struct Controller {
    namespace: String,
    watch_loop: WatchLoop,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing DummySite Controller");

        // Create Kubernetes client (in-cluster service account or local kubeconfig)
        let kube_client = Client::try_default().await?;

        let fetcher = HttpSiteFetcher::new(config.fetch_timeout)?;
        let store = KubeObjectStore::new(kube_client.clone(), &config.namespace);
        let provisioner = ResourceProvisioner::new(Arc::new(store), config.server_image.clone());
        let reconciler = SiteReconciler::new(Arc::new(fetcher), provisioner);

        let dummy_site_api: Api<DummySite> = Api::namespaced(kube_client, &config.namespace);
        let watch_loop = WatchLoop::new(
            Box::new(KubeSiteEventSource::new(dummy_site_api)),
            Arc::new(reconciler),
            config.reconnect_backoff(),
            Arc::new(TokioSleeper),
        );

        Ok(Self {
            namespace: config.namespace,
            watch_loop,
        })
    }

    /// Runs the controller until the process receives Ctrl-C.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("DummySite Controller running in namespace {}", self.namespace);

        self.watch_loop.run_until(shutdown_signal()).await;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the controller simply runs until killed.
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
