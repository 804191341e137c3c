// src/fetch/browserless.rs

//! Rendered-page fetcher backed by a Browserless `/content` endpoint.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::fetch::Fetcher;
use crate::fetch::http::create_async_client;
use crate::models::{FetchedContent, FetcherConfig, MonitorConfig};

/// Fetches fully rendered HTML, for pages that build their content in script.
pub struct BrowserlessFetcher {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessFetcher {
    pub fn new(monitor: &MonitorConfig, fetcher: &FetcherConfig) -> Result<Self> {
        let base_url = fetcher
            .browserless_url
            .as_deref()
            .ok_or_else(|| AppError::config("fetcher.browserless_url is not set"))?;

        Ok(Self {
            client: create_async_client(monitor)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: fetcher.browserless_token.clone(),
        })
    }

    fn endpoint(&self) -> String {
        match &self.token {
            Some(token) => format!("{}/content?token={token}", self.base_url),
            None => format!("{}/content", self.base_url),
        }
    }
}

#[async_trait]
impl Fetcher for BrowserlessFetcher {
    async fn fetch(&self, target: &str) -> Result<FetchedContent> {
        let body = serde_json::json!({ "url": target });

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::fetch(target, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::fetch(
                target,
                format!("browserless returned {status}: {message}"),
            ));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| AppError::fetch(target, e))?;
        Ok(FetchedContent::new(raw))
    }
}
