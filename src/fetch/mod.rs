//! Page fetchers.
//!
//! - `HttpFetcher`: plain GET of the target
//! - `BrowserlessFetcher`: script-rendered HTML from a Browserless service

mod browserless;
mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, FetchedContent, FetcherKind};

pub use browserless::BrowserlessFetcher;
pub use http::HttpFetcher;

/// Retrieves page content for a target.
///
/// Network failures, timeouts and non-success statuses all surface as
/// `AppError::Fetch`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, target: &str) -> Result<FetchedContent>;
}

/// Build the fetcher selected in the configuration.
pub fn from_config(config: &Config) -> Result<Box<dyn Fetcher>> {
    match config.fetcher.kind {
        FetcherKind::Http => Ok(Box::new(HttpFetcher::new(&config.monitor)?)),
        FetcherKind::Browserless => Ok(Box::new(BrowserlessFetcher::new(
            &config.monitor,
            &config.fetcher,
        )?)),
    }
}
