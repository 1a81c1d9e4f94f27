//! Mock SiteFetcher for unit testing
//!
//! Serves canned responses keyed by URL and records every request, so tests
//! can assert what was fetched and in which order.

use crate::error::FetchError;
use crate::fetcher_trait::{SiteContent, SiteFetcher};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum MockResponse {
    Body(Vec<u8>),
    Status(u16),
}

/// Mock SiteFetcher for testing
///
/// Unknown URLs answer with 404.
#[derive(Debug, Clone, Default)]
pub struct MockSiteFetcher {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockSiteFetcher {
    /// Create a new mock fetcher with no pages
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url` (for test setup)
    pub fn add_page(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), MockResponse::Body(body.into()));
    }

    /// Answer `url` with a non-success status (for test setup)
    pub fn fail_with_status(&self, url: impl Into<String>, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), MockResponse::Status(status));
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SiteFetcher for MockSiteFetcher {
    async fn fetch(&self, url: &str) -> Result<SiteContent, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(MockResponse::Body(body)) => Ok(SiteContent::new(url, body)),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
