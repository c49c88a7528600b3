//! Bing Web Search API engine

use super::{api_error, SearchEngine, SearchResultItem};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::logging::log_debug;
use serde::Deserialize;
use std::time::Duration;

const MAX_COUNT: usize = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    #[serde(default)]
    web_pages: Option<BingWebPages>,
}

#[derive(Debug, Default, Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<BingWebPage>,
}

#[derive(Debug, Default, Deserialize)]
struct BingWebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Clone)]
pub struct BingApiEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl BingApiEngine {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            endpoint: config.bing_endpoint.clone(),
            api_key: config.bing_api_key.clone(),
            timeout: config.http_timeout,
        }
    }
}

#[async_trait::async_trait]
impl SearchEngine for BingApiEngine {
    fn name(&self) -> &'static str {
        "bing"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>, SearchError> {
        let Some(api_key) = &self.api_key else {
            log_debug!(engine = "bing", "Bing API key not configured");
            return Ok(Vec::new());
        };

        let count = limit.min(MAX_COUNT).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", api_key)
            .query(&[("q", query), ("count", count.as_str()), ("mkt", "en-US")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(&e))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let data: BingResponse = response
            .json()
            .await
            .map_err(|e| SearchError::from_reqwest(&e))?;

        Ok(data
            .web_pages
            .map(|pages| pages.value)
            .unwrap_or_default()
            .into_iter()
            .map(|page| SearchResultItem {
                title: page.name,
                link: page.url,
                snippet: page.snippet,
            })
            .collect())
    }
}
