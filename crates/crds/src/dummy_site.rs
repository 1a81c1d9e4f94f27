//! DummySite CRD
//!
//! Declares a static site whose content is fetched from `website_url` and
//! served from inside the cluster.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "example.com",
    version = "v1",
    kind = "DummySite",
    plural = "dummysites",
    shortname = "dsite",
    namespaced,
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".spec.website_url"}"#
)]
pub struct DummySiteSpec {
    /// URL of the page whose HTML is served by the site
    pub website_url: String,
}

impl DummySite {
    /// The resource name, if the API server supplied one.
    pub fn site_name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// The URL the site content is fetched from.
    pub fn website_url(&self) -> &str {
        &self.spec.website_url
    }
}
