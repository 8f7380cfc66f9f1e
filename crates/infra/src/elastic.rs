//! HTTP search engine client

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use pulse_core::config::SearchSettings;
use pulse_core::{PulseError, Result, SearchEngine, SearchResponse};

/// Search engine client configuration
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            timeout: Duration::from_secs(30),
            username: None,
            password: None,
        }
    }
}

impl From<&SearchSettings> for ElasticConfig {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(settings.timeout_secs),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }
    }
}

/// Client for the engine's `_count` and `_search` endpoints
#[derive(Debug, Clone)]
pub struct ElasticClient {
    config: ElasticConfig,
    client: reqwest::Client,
}

impl ElasticClient {
    /// Create a new client
    pub fn new(config: ElasticConfig) -> Result<Self> {
        url::Url::parse(&config.base_url).map_err(|e| {
            PulseError::engine(format!("Invalid search engine URL '{}': {}", config.base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PulseError::engine(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Check if the engine is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/_cluster/health", self.config.base_url);

        match self.authorized(self.client.get(&url)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Search engine health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_ref()),
            None => request,
        }
    }

    async fn post(&self, index: &str, endpoint: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{}/{}", self.config.base_url, index, endpoint);
        tracing::debug!(index, endpoint, body_bytes = body.to_string().len(), "engine request");

        let response = self
            .authorized(self.client.post(&url).json(body))
            .send()
            .await
            .map_err(|e| {
                PulseError::engine(format!("Failed to send request to search engine: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PulseError::engine(format!(
                "Search engine returned error {}: {}",
                status, detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PulseError::engine(format!("Failed to parse search engine response: {}", e)))
    }
}

/// Count response payload
#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[async_trait]
impl SearchEngine for ElasticClient {
    async fn count(&self, index: &str, body: &Value) -> Result<u64> {
        let raw = self.post(index, "_count", body).await?;
        let parsed: CountResponse = serde_json::from_value(raw)?;
        Ok(parsed.count)
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse> {
        let raw = self.post(index, "_search", body).await?;
        Ok(SearchResponse::from_raw(&raw))
    }
}
