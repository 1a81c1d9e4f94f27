//! SiteFetcher trait for mocking
//!
//! The controller depends on this trait rather than on `HttpSiteFetcher`
//! so reconciliation can be unit tested without network access.

use crate::error::FetchError;

/// Body of a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContent {
    /// URL the body was finally served from (after redirects)
    pub url: String,
    /// Raw response body
    pub body: Vec<u8>,
}

impl SiteContent {
    /// Create content from any byte source
    pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    /// The body as text, if it is valid UTF-8.
    pub fn as_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Trait for site content retrieval
///
/// Implementations must be shareable across tasks.
#[async_trait::async_trait]
pub trait SiteFetcher: Send + Sync {
    /// Fetch the body served at `url`
    async fn fetch(&self, url: &str) -> Result<SiteContent, FetchError>;
}
