//! Naver web search API engine

use super::renderer::html_to_text;
use super::{api_error, SearchEngine, SearchResultItem};
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::logging::log_debug;
use serde::Deserialize;
use std::time::Duration;

const MAX_DISPLAY: usize = 100;

#[derive(Debug, Default, Deserialize)]
struct NaverResponse {
    #[serde(default)]
    items: Vec<NaverItem>,
}

#[derive(Debug, Default, Deserialize)]
struct NaverItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone)]
pub struct NaverApiEngine {
    client: reqwest::Client,
    endpoint: String,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl NaverApiEngine {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        let credentials = config
            .naver_client_id
            .clone()
            .zip(config.naver_client_secret.clone());
        Self {
            client,
            endpoint: config.naver_endpoint.clone(),
            credentials,
            timeout: config.http_timeout,
        }
    }
}

#[async_trait::async_trait]
impl SearchEngine for NaverApiEngine {
    fn name(&self) -> &'static str {
        "naver"
    }

    fn requires_api_key(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>, SearchError> {
        let Some((client_id, client_secret)) = &self.credentials else {
            log_debug!(engine = "naver", "Naver credentials not configured");
            return Ok(Vec::new());
        };

        let display = limit.min(MAX_DISPLAY).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Naver-Client-Id", client_id)
            .header("X-Naver-Client-Secret", client_secret)
            .query(&[("query", query), ("display", display.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(&e))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let data: NaverResponse = response
            .json()
            .await
            .map_err(|e| SearchError::from_reqwest(&e))?;

        Ok(data
            .items
            .into_iter()
            .map(|item| SearchResultItem {
                title: html_to_text(&item.title),
                link: item.link,
                snippet: html_to_text(&item.description),
            })
            .collect())
    }
}
