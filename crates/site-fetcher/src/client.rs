//! HTTP site fetcher
//!
//! Fetches page content over HTTP(S) with `reqwest`. Redirects are followed
//! using reqwest's default policy and only the final body is returned.

use crate::error::FetchError;
use crate::fetcher_trait::{SiteContent, SiteFetcher};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

/// Fetches site content with a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpSiteFetcher {
    client: Client,
}

impl HttpSiteFetcher {
    /// Create a new fetcher
    ///
    /// # Arguments
    /// * `timeout` - Whole-request timeout, `None` to wait indefinitely
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(concat!(
            "dummysite-controller/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Parse `url` and require an absolute http(s) URL.
pub fn parse_site_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[async_trait::async_trait]
impl SiteFetcher for HttpSiteFetcher {
    async fn fetch(&self, url: &str) -> Result<SiteContent, FetchError> {
        let parsed = parse_site_url(url)?;
        debug!("GET {}", parsed);

        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.bytes().await?;
        debug!("Fetched {} bytes from {}", body.len(), final_url);

        Ok(SiteContent::new(final_url, body.to_vec()))
    }
}
