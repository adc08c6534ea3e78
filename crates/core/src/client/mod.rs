pub mod error;

pub use error::TransportError;

use crate::config::{ApiKey, Settings};
use crate::endpoint::{Endpoint, QueryParams};
use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// One GET for one user action. No retry, no cache.
    async fn fetch(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> std::result::Result<Value, TransportError>;
}

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: ApiKey,
}

impl AlphaVantageClient {
    pub fn from_settings(settings: &Settings, api_key: ApiKey) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("ALPHAVANTAGE_BASE_URL is not a URL: {}", settings.base_url))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Fully formed request URL, API key included.
    pub fn query_url(&self, endpoint: Endpoint, params: &QueryParams) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .extend_pairs(endpoint.query_pairs(params))
            .append_pair("apikey", self.api_key.expose());
        url
    }
}

/// The URL with the `apikey` value masked, for logs.
pub fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "apikey" { "***".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

#[async_trait::async_trait]
impl MarketDataClient for AlphaVantageClient {
    fn provider_name(&self) -> &'static str {
        "alphavantage"
    }

    async fn fetch(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> std::result::Result<Value, TransportError> {
        let url = self.query_url(endpoint, params);
        tracing::debug!(function = %endpoint, url = %redacted(&url), "requesting market data");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(TransportError::request)?;
        let status = res.status();
        let text = res.text().await.map_err(TransportError::request)?;

        if !status.is_success() {
            tracing::warn!(function = %endpoint, %status, "market data request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<Value>(&text).map_err(|source| TransportError::Body { source, text })
    }
}
