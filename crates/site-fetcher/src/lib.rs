//! Site Fetcher
//!
//! Retrieves the raw page content a `DummySite` points at.
//!
//! # Example
//!
//! ```no_run
//! use site_fetcher::{HttpSiteFetcher, SiteFetcher};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpSiteFetcher::new(Some(Duration::from_secs(30)))?;
//! let content = fetcher.fetch("http://example.com/").await?;
//! println!("{} bytes", content.body.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod fetcher_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{HttpSiteFetcher, parse_site_url};
pub use error::FetchError;
pub use fetcher_trait::{SiteContent, SiteFetcher};
#[cfg(feature = "test-util")]
pub use mock::MockSiteFetcher;
