//! Reconciliation logic for DummySite resources.
//!
//! One ADDED event becomes one provisioning run: validate the event, fetch
//! the page, then ensure the derived objects. Failures stay with the site
//! that caused them; nothing is retried until the site is delivered again.

use crate::error::ControllerError;
use crate::provisioner::{ResourceProvisioner, SiteResourceSet};
use crds::DummySite;
use site_fetcher::{SiteFetcher, parse_site_url};
use std::sync::Arc;
use tracing::{error, info};

/// Reconciles DummySite resources into their derived objects.
#[derive(Clone)]
pub struct SiteReconciler {
    fetcher: Arc<dyn SiteFetcher>,
    provisioner: ResourceProvisioner,
}

impl SiteReconciler {
    /// Creates a new reconciler instance.
    pub fn new(fetcher: Arc<dyn SiteFetcher>, provisioner: ResourceProvisioner) -> Self {
        Self {
            fetcher,
            provisioner,
        }
    }

    /// Reconciles a DummySite resource.
    ///
    /// This method:
    /// 1. Rejects events without a name or with an unusable URL
    /// 2. Fetches the page at `spec.website_url`
    /// 3. Ensures the ConfigMap, Pod and Service, in that order
    ///
    /// No object is touched when validation or the fetch fails.
    pub async fn reconcile(&self, site: &DummySite) -> Result<SiteResourceSet, ControllerError> {
        let (name, url) = validate_site(site)?;

        info!("Creating site {} for {}", name, url);

        let content = self.fetcher.fetch(url).await?;

        self.provisioner.apply(name, &content).await
    }

    /// Reconciles an ADDED DummySite and contains any failure.
    ///
    /// Returns the provisioning outcome, or `None` after logging the failure.
    /// This is the only place a reconcile failure is logged.
    pub async fn handle_added(&self, site: &DummySite) -> Option<SiteResourceSet> {
        let name = site.site_name().unwrap_or("<unknown>");

        match self.reconcile(site).await {
            Ok(resources) => {
                info!("Site {} provisioned: {:?}", name, resources);
                Some(resources)
            }
            Err(e) => {
                error!("Failed to create site {}: {}", name, e);
                None
            }
        }
    }
}

/// Extracts `(name, url)` from a DummySite, rejecting unusable events.
pub fn validate_site(site: &DummySite) -> Result<(&str, &str), ControllerError> {
    let name = site
        .site_name()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ControllerError::InvalidSite("DummySite missing metadata.name".to_string()))?;

    let url = site.website_url().trim();
    if url.is_empty() {
        return Err(ControllerError::InvalidSite(format!(
            "DummySite {} has an empty spec.website_url",
            name
        )));
    }

    parse_site_url(url)
        .map_err(|e| ControllerError::InvalidSite(format!("DummySite {}: {}", name, e)))?;

    Ok((name, url))
}
