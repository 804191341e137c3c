// src/fetch/http.rs

//! Plain HTTP fetcher.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::fetch::Fetcher;
use crate::models::{FetchedContent, MonitorConfig};

/// Create a configured asynchronous HTTP client.
pub(crate) fn create_async_client(config: &MonitorConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.fetch_timeout())
        .build()?;
    Ok(client)
}

/// Fetches the raw response body with a GET request.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &str) -> Result<FetchedContent> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(target, e))?;

        let raw = response
            .text()
            .await
            .map_err(|e| AppError::fetch(target, e))?;

        log::debug!("Fetched {} ({} bytes)", target, raw.len());
        Ok(FetchedContent::new(raw))
    }
}
