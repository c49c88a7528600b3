//! Prompt tracking: one query, several LLM sources, several search engines,
//! one report.
//!
//! [`PromptTracker::run_prompt_tracking`] runs two independent branches in
//! the same task and joins them:
//!
//! - the LLM branch walks the requested sources in order, one
//!   [`LlmRouter::call_with_fallback`] per source, and scores each answer
//! - the search branch runs [`SearchRankProber::run_search_rank`]
//!
//! A failure in either branch is recorded in the report and never affects
//! the other. Only request validation in [`PromptTracker::track`] can fail
//! the whole call.
//!
//! Reports never contain the full answer text: each entry keeps at most
//! [`RESPONSE_EXCERPT_CHARS`] characters.

use crate::config::{ConfigSource, CostRates, EnvConfigSource};
use crate::credentials::{resolve_all, ProviderFamily};
use crate::error::{LlmError, TrackerError, TrackerResult};
use crate::fallback::{FallbackAnswer, LlmRouter};
use crate::logging::{log_info, log_warn};
use crate::mention::{evaluate_mention, extract_brand, MentionScore, MentionTier};
use crate::ops::{classify_error, estimate_cost_usd, summarize_llm_runs, ErrorType, OpsSummary};
use crate::providers::{HttpAdapterFactory, InvokeOptions};
use crate::search::{SearchRankProber, SearchRankResults};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

pub const RESPONSE_EXCERPT_CHARS: usize = 1500;
pub const STORAGE_POLICY: &str = "no_raw_prompt_or_llm_response";
pub const SHARE_OF_MODEL_METHOD: &str = "average_of_available_llm_scores";

fn default_llm_sources() -> Vec<String> {
    vec!["gpt".to_string(), "gemini".to_string()]
}

/// Caller input for [`PromptTracker::track`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRequest {
    /// Primary query; placed first when `queries` is also given
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub queries: Vec<String>,
    pub target_url: String,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default = "default_llm_sources")]
    pub llm_sources: Vec<String>,
    #[serde(default)]
    pub search_engines: Vec<String>,
}

impl TrackingRequest {
    pub fn new(query: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            queries: Vec::new(),
            target_url: target_url.into(),
            brand_name: None,
            llm_sources: default_llm_sources(),
            search_engines: Vec::new(),
        }
    }
}

/// Trim, drop blanks, put `query` first unless it already leads, and
/// optionally drop repeats (first occurrence wins).
pub fn normalize_queries(query: Option<&str>, queries: &[String], dedup: bool) -> Vec<String> {
    let mut normalized: Vec<String> = queries
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(primary) = query.map(str::trim).filter(|q| !q.is_empty()) {
        if normalized.first().map(String::as_str) != Some(primary) {
            normalized.insert(0, primary.to_string());
        }
    }

    if dedup {
        let mut seen = HashSet::new();
        normalized.retain(|item| seen.insert(item.clone()));
    }
    normalized
}

/// Lowercase, keep allow-listed values only, drop repeats, keep order.
pub fn normalize_options(values: &[String], allowed: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|value| value.trim().to_lowercase())
        .filter(|key| !key.is_empty() && allowed.contains(key))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// The text sent to every provider for a tracked query.
pub fn build_tracking_prompt(query: &str) -> String {
    query.trim().to_string()
}

/// One requested source's outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRunRecord {
    /// Source as requested, lowercased
    pub source: String,
    pub provider_used: Option<ProviderFamily>,
    pub model: Option<String>,
    pub tier: MentionTier,
    pub score: u32,
    pub reason: String,
    pub latency_ms: u64,
    pub error_type: Option<ErrorType>,
    pub estimated_cost_usd: f64,
    pub response_excerpt: String,
    pub response_share_url: Option<String>,
}

impl LlmRunRecord {
    pub fn answered(
        source: impl Into<String>,
        answer: FallbackAnswer,
        mention: MentionScore,
        estimated_cost_usd: f64,
    ) -> Self {
        Self {
            source: source.into(),
            provider_used: Some(answer.provider_used),
            model: Some(answer.model),
            tier: mention.tier,
            score: mention.score,
            reason: mention.reason,
            latency_ms: answer.latency_ms,
            error_type: None,
            estimated_cost_usd,
            response_excerpt: answer.text.chars().take(RESPONSE_EXCERPT_CHARS).collect(),
            response_share_url: answer.reference_url,
        }
    }

    pub fn not_available(source: impl Into<String>, error: &LlmError) -> Self {
        let reason = error.to_string();
        let mention = MentionScore::not_available(reason.clone());
        Self {
            source: source.into(),
            provider_used: None,
            model: None,
            tier: mention.tier,
            score: mention.score,
            error_type: Some(classify_error(&reason)),
            reason,
            latency_ms: 0,
            estimated_cost_usd: 0.0,
            response_excerpt: String::new(),
            response_share_url: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.tier != MentionTier::NotAvailable
    }
}

/// Integer-floored mean of non-`not_available` scores; 0 when none.
pub fn share_of_model_score(records: &[LlmRunRecord]) -> u32 {
    let scores: Vec<u32> = records
        .iter()
        .filter(|record| record.is_success())
        .map(|record| record.score)
        .collect();
    if scores.is_empty() {
        return 0;
    }
    scores.iter().sum::<u32>() / scores.len() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicyMeta {
    pub provider_fallback: String,
    pub max_attempts_per_source: u32,
}

impl Default for RetryPolicyMeta {
    fn default() -> Self {
        Self {
            provider_fallback: "enabled".to_string(),
            max_attempts_per_source: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityMeta {
    pub tier_score_weights: BTreeMap<MentionTier, u32>,
    pub share_of_model_score_method: String,
}

impl Default for QualityMeta {
    fn default() -> Self {
        Self {
            tier_score_weights: MentionTier::weights(),
            share_of_model_score_method: SHARE_OF_MODEL_METHOD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingMeta {
    pub run_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub storage_policy: String,
    pub retry_policy: RetryPolicyMeta,
    pub quality: QualityMeta,
    pub ops: OpsSummary,
}

impl TrackingMeta {
    pub fn new(ops: OpsSummary) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            captured_at: Utc::now(),
            storage_policy: STORAGE_POLICY.to_string(),
            retry_policy: RetryPolicyMeta::default(),
            quality: QualityMeta::default(),
            ops,
        }
    }
}

/// Everything one tracked query produced; handed to persistence as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTrackingReport {
    pub query: String,
    pub target_url: String,
    pub brand: String,
    pub share_of_model_score: u32,
    pub llm_results: Vec<LlmRunRecord>,
    pub search_rank_results: SearchRankResults,
    pub tracking_meta: TrackingMeta,
}

impl PromptTrackingReport {
    /// First entry with an answer, else the first entry.
    pub fn primary_result(&self) -> Option<&LlmRunRecord> {
        self.llm_results
            .iter()
            .find(|record| record.is_success())
            .or_else(|| self.llm_results.first())
    }
}

/// Validates tracking requests and produces reports.
#[derive(Clone)]
pub struct PromptTracker {
    config: Arc<dyn ConfigSource>,
    router: LlmRouter,
    prober: SearchRankProber,
}

impl std::fmt::Debug for PromptTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTracker")
            .field("router", &self.router)
            .field("prober", &self.prober)
            .finish_non_exhaustive()
    }
}

impl PromptTracker {
    pub fn new(config: Arc<dyn ConfigSource>, router: LlmRouter, prober: SearchRankProber) -> Self {
        Self {
            config,
            router,
            prober,
        }
    }

    /// Environment configuration, HTTP adapters, plain-HTTP Google renderer.
    pub fn from_env() -> Self {
        let config: Arc<dyn ConfigSource> = Arc::new(EnvConfigSource);
        let client = reqwest::Client::new();
        let router = LlmRouter::new(
            Arc::clone(&config),
            Arc::new(HttpAdapterFactory::with_client(client.clone())),
        );
        let prober = SearchRankProber::new(Arc::clone(&config), client);
        Self::new(config, router, prober)
    }

    /// Validate `request` and track each of its queries in order.
    ///
    /// # Errors
    ///
    /// Returns a [`TrackerError`] when there is nothing to run: no query,
    /// too many queries, no target URL, no allow-listed LLM source, or no
    /// provider credential at all. Provider and engine failures after
    /// validation are reported inside each [`PromptTrackingReport`].
    pub async fn track(
        &self,
        request: &TrackingRequest,
    ) -> TrackerResult<Vec<PromptTrackingReport>> {
        let config = self.config.load();

        let queries = normalize_queries(request.query.as_deref(), &request.queries, false);
        if queries.is_empty() {
            return Err(TrackerError::NoQueries);
        }

        let target_url = request.target_url.trim();
        if target_url.is_empty() {
            return Err(TrackerError::MissingTargetUrl);
        }

        let llm_sources = normalize_options(&request.llm_sources, &config.limits.llm_sources);
        if llm_sources.is_empty() {
            return Err(TrackerError::NoLlmSources {
                available: config.limits.llm_sources.join(", "),
            });
        }

        let search_engines = normalize_options(&request.search_engines, &config.search.engines);

        if queries.len() > config.limits.max_queries {
            return Err(TrackerError::TooManyQueries {
                max: config.limits.max_queries,
                requested: queries.len(),
            });
        }

        let credentials = resolve_all(&config);
        if !credentials.iter().any(|credential| credential.available) {
            let reasons = credentials
                .iter()
                .filter_map(|credential| credential.reason.as_deref())
                .collect::<Vec<_>>()
                .join("; ");
            log_warn!(reasons = %reasons, "Prompt tracking rejected: no provider configured");
            return Err(TrackerError::NoProvidersAvailable { reasons });
        }

        let mut reports = Vec::with_capacity(queries.len());
        for query in &queries {
            reports.push(
                self.run_prompt_tracking(
                    query,
                    target_url,
                    request.brand_name.as_deref(),
                    &llm_sources,
                    &search_engines,
                )
                .await,
            );
        }
        Ok(reports)
    }

    /// Track one query. Never fails; every source and engine gets an entry.
    pub async fn run_prompt_tracking(
        &self,
        query: &str,
        target_url: &str,
        brand_name: Option<&str>,
        llm_sources: &[String],
        search_engines: &[String],
    ) -> PromptTrackingReport {
        let config = self.config.load();
        let brand = extract_brand(target_url, brand_name);
        let prompt = build_tracking_prompt(query);

        let (llm_results, search_rank_results) = tokio::join!(
            self.run_llm_sources(&prompt, target_url, &brand, llm_sources, &config.cost_rates),
            self.prober.run_search_rank(query, target_url, search_engines),
        );

        let share_of_model_score = share_of_model_score(&llm_results);
        let tracking_meta = TrackingMeta::new(summarize_llm_runs(&llm_results));

        log_info!(
            run_id = %tracking_meta.run_id,
            brand = %brand,
            sources = llm_results.len(),
            success_count = tracking_meta.ops.success_count,
            failure_count = tracking_meta.ops.failure_count,
            engines = search_rank_results.len(),
            share_of_model_score = share_of_model_score,
            "Prompt tracking completed"
        );

        PromptTrackingReport {
            query: query.to_string(),
            target_url: target_url.to_string(),
            brand,
            share_of_model_score,
            llm_results,
            search_rank_results,
            tracking_meta,
        }
    }

    async fn run_llm_sources(
        &self,
        prompt: &str,
        target_url: &str,
        brand: &str,
        llm_sources: &[String],
        rates: &CostRates,
    ) -> Vec<LlmRunRecord> {
        let options = InvokeOptions::default();
        let mut records = Vec::with_capacity(llm_sources.len());

        for source in llm_sources {
            let source = source.trim().to_lowercase();
            let record = match self.router.call_with_fallback(prompt, &source, &options).await {
                Ok(answer) => {
                    let mention = evaluate_mention(&answer.text, target_url, brand);
                    let provider = answer.provider_used.as_str();
                    let cost = estimate_cost_usd(provider, prompt, &answer.text, rates);
                    LlmRunRecord::answered(source, answer, mention, cost)
                }
                Err(error) => LlmRunRecord::not_available(source, &error),
            };
            records.push(record);
        }

        records
    }
}
