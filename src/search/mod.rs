//! Search-rank probing
//!
//! For each requested engine, fetch the top organic results for a query and
//! report the 1-based position of the first result on the target domain.
//! Engine failures never escape: each engine gets a [`SearchRankResult`]
//! whose `status` says what happened.
//!
//! Which engines exist is configuration: an engine must be both implemented
//! (registered on the prober) and listed in `SEARCH_ENGINES`, otherwise it is
//! reported as `unsupported`.

pub mod bing;
pub mod google;
pub mod naver;
pub mod renderer;

pub use bing::BingApiEngine;
pub use google::GoogleScrapeEngine;
pub use naver::NaverApiEngine;
pub use renderer::{HttpPageRenderer, PageRenderer, RenderedPage};

use crate::config::{ConfigSource, EnvConfigSource, TrackerConfig};
use crate::error::SearchError;
use crate::logging::{log_error, log_info, log_warn};
use crate::mention::normalize_domain;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Rows requested from every engine and kept in the report
pub const RESULT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Results returned; `rank` may still be `None`
    Ok,
    /// Zero results, including soft anti-bot blocks and scrape timeouts
    Unavailable,
    Unsupported,
    Disabled,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// One engine's outcome for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRankResult {
    pub status: SearchStatus,
    pub rank: Option<usize>,
    pub result_count: usize,
    pub results: Vec<SearchResultItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchRankResult {
    fn empty(status: SearchStatus, error: Option<String>) -> Self {
        Self {
            status,
            rank: None,
            result_count: 0,
            results: Vec::new(),
            error,
        }
    }

    pub fn disabled() -> Self {
        Self::empty(SearchStatus::Disabled, Some("temporarily_disabled".to_string()))
    }

    pub fn unsupported() -> Self {
        Self::empty(SearchStatus::Unsupported, None)
    }

    /// Rank the fetched rows; an empty fetch is `unavailable`.
    pub fn from_results(results: Vec<SearchResultItem>, target_domain: &str) -> Self {
        let rank = get_rank(&results, target_domain);
        let status = if results.is_empty() {
            SearchStatus::Unavailable
        } else {
            SearchStatus::Ok
        };
        let result_count = results.len();
        Self {
            status,
            rank,
            result_count,
            results: results.into_iter().take(RESULT_LIMIT).collect(),
            error: None,
        }
    }

    pub fn from_error(error: &SearchError) -> Self {
        let status = if error.is_soft_unavailable() {
            SearchStatus::Unavailable
        } else {
            SearchStatus::Error
        };
        Self::empty(status, Some(error.safe_message()))
    }
}

/// Engine name to outcome, in the order engines were requested.
///
/// Serializes as a JSON object; deserializing keeps document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRankResults {
    entries: Vec<(String, SearchRankResult)>,
}

impl SearchRankResults {
    /// Insert or replace, keeping the first-seen position.
    pub fn insert(&mut self, engine: impl Into<String>, result: SearchRankResult) {
        let engine = engine.into();
        match self.entries.iter_mut().find(|(name, _)| *name == engine) {
            Some((_, existing)) => *existing = result,
            None => self.entries.push((engine, result)),
        }
    }

    pub fn get(&self, engine: &str) -> Option<&SearchRankResult> {
        self.entries
            .iter()
            .find(|(name, _)| name == engine)
            .map(|(_, result)| result)
    }

    pub fn engines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SearchRankResult)> {
        self.entries
            .iter()
            .map(|(name, result)| (name.as_str(), result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SearchRankResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (engine, result) in &self.entries {
            map.serialize_entry(engine, result)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SearchRankResults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultsVisitor;

        impl<'de> Visitor<'de> for ResultsVisitor {
            type Value = SearchRankResults;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of engine name to search rank result")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut results = SearchRankResults::default();
                while let Some((engine, result)) =
                    access.next_entry::<String, SearchRankResult>()?
                {
                    results.insert(engine, result);
                }
                Ok(results)
            }
        }

        deserializer.deserialize_map(ResultsVisitor)
    }
}

/// 1-based position of the first row whose domain contains, or is contained
/// in, `target_domain`.
pub fn get_rank(results: &[SearchResultItem], target_domain: &str) -> Option<usize> {
    if target_domain.is_empty() {
        return None;
    }

    results.iter().position(|result| {
        let link_domain = normalize_domain(&result.link);
        !link_domain.is_empty()
            && (target_domain.contains(&link_domain) || link_domain.contains(target_domain))
    })
    .map(|index| index + 1)
}

/// One search backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchEngine: Send + Sync {
    /// Lowercase engine key as requested by callers
    fn name(&self) -> &'static str;

    /// API engines without credentials return no rows rather than failing
    fn requires_api_key(&self) -> bool;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>, SearchError>;
}

/// Reduce a non-2xx search API response to [`SearchError::Http`].
pub(crate) async fn api_error(response: reqwest::Response) -> SearchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .or_else(|| json.get("errorMessage"))
                .and_then(|value| value.as_str())
                .map(|message| message.trim().to_string())
        })
        .filter(|message| !message.is_empty());
    SearchError::Http { status, message }
}

/// Runs every requested engine in order and assembles the per-engine report.
#[derive(Clone)]
pub struct SearchRankProber {
    config: Arc<dyn ConfigSource>,
    client: reqwest::Client,
    renderer: Arc<dyn PageRenderer>,
    overrides: Vec<Arc<dyn SearchEngine>>,
}

impl fmt::Debug for SearchRankProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchRankProber")
            .field("overrides", &self.overrides.iter().map(|e| e.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SearchRankProber {
    pub fn new(config: Arc<dyn ConfigSource>, client: reqwest::Client) -> Self {
        let renderer = Arc::new(HttpPageRenderer::new(client.clone()));
        Self {
            config,
            client,
            renderer,
            overrides: Vec::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvConfigSource), reqwest::Client::new())
    }

    /// Use a different page renderer (e.g. a headless browser) for Google.
    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Register an engine, replacing any built-in engine with the same name.
    pub fn with_engine(mut self, engine: Arc<dyn SearchEngine>) -> Self {
        self.overrides.retain(|existing| existing.name() != engine.name());
        self.overrides.push(engine);
        self
    }

    fn engine_for(&self, key: &str, config: &TrackerConfig) -> Option<Arc<dyn SearchEngine>> {
        if !config.search.engines.iter().any(|enabled| enabled == key) {
            return None;
        }
        if let Some(engine) = self.overrides.iter().find(|engine| engine.name() == key) {
            return Some(Arc::clone(engine));
        }

        let engine: Arc<dyn SearchEngine> = match key {
            "google" => Arc::new(GoogleScrapeEngine::new(
                Arc::clone(&self.renderer),
                &config.search,
            )),
            "naver" => Arc::new(NaverApiEngine::new(self.client.clone(), &config.search)),
            "bing" => Arc::new(BingApiEngine::new(self.client.clone(), &config.search)),
            _ => return None,
        };
        Some(engine)
    }

    /// Probe every engine in `engines` for `query`, in order.
    pub async fn run_search_rank(
        &self,
        query: &str,
        target_url: &str,
        engines: &[String],
    ) -> SearchRankResults {
        let config = self.config.load();
        let target_domain = normalize_domain(target_url);
        let keys: Vec<String> = engines
            .iter()
            .map(|engine| engine.trim().to_lowercase())
            .filter(|engine| !engine.is_empty())
            .collect();
        let mut output = SearchRankResults::default();

        if config.search.disabled {
            log_warn!(
                engines = ?keys,
                "Search-rank request skipped: SEARCH_RANK_TEMP_DISABLED=true"
            );
            for key in keys {
                output.insert(key, SearchRankResult::disabled());
            }
            return output;
        }

        log_info!(
            target_domain = %target_domain,
            engines = ?keys,
            query_chars = query.chars().count(),
            "Run search-rank"
        );

        for key in keys {
            let Some(engine) = self.engine_for(&key, &config) else {
                log_warn!(engine = %key, "Search engine not supported");
                output.insert(key, SearchRankResult::unsupported());
                continue;
            };

            let result = match engine.fetch(query, RESULT_LIMIT).await {
                Ok(results) => {
                    let result = SearchRankResult::from_results(results, &target_domain);
                    if result.status == SearchStatus::Unavailable {
                        log_warn!(
                            engine = %key,
                            target_domain = %target_domain,
                            requires_api_key = engine.requires_api_key(),
                            "Search-rank unavailable"
                        );
                    }
                    result
                }
                Err(error) => {
                    let result = SearchRankResult::from_error(&error);
                    if result.status == SearchStatus::Unavailable {
                        log_warn!(
                            engine = %key,
                            target_domain = %target_domain,
                            reason = ?result.error,
                            "Search-rank timeout/block treated as unavailable"
                        );
                    } else {
                        log_error!(
                            engine = %key,
                            target_domain = %target_domain,
                            error = ?result.error,
                            "Search-rank provider error"
                        );
                    }
                    result
                }
            };
            output.insert(key, result);
        }

        output
    }
}
