//! DummySite Controller
//!
//! Serves static sites declared as `DummySite` resources.
//!
//! For every DummySite added to the watched namespace the controller fetches
//! the page at `spec.website_url` and provisions:
//! - ConfigMap `{name}-html` holding the page as `index.html`
//! - Pod `{name}-pod` serving the ConfigMap with a static file server
//! - Service `{name}-service` exposing the Pod on port 80

mod backoff;
mod config;
mod controller;
mod error;
mod provisioner;
mod reconciler;
mod resources;
mod store;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // kube and reqwest both use rustls; pin the process-wide crypto provider
    // before any TLS client is built.
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider already installed, keeping the existing one");
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting DummySite Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace);
    info!("  Server image: {}", config.server_image);
    info!(
        "  Reconnect: {:?} every {:?} (max {:?})",
        config.backoff_policy, config.reconnect_delay, config.reconnect_max_delay
    );
    info!("  Fetch timeout: {:?}", config.fetch_timeout);

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
