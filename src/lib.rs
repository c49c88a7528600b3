//! # aeo-tracker
//!
//! Answer-engine visibility tracking: ask several LLM providers the same
//! question, score how prominently a target brand appears in each answer,
//! and probe where the brand's domain ranks in classic web search.
//!
//! ## Key Features
//!
//! - **Multiple Providers**: OpenAI (Responses API), Azure OpenAI, Gemini and Perplexity behind one adapter trait
//! - **Static Fallback**: each requested source walks a fixed fallback chain, one attempt per provider
//! - **Mention Scoring**: tiered brand/domain heuristic (core, competitive, minor, not mentioned)
//! - **Search Rank**: Google scraping with anti-bot detection and a hard timeout, Naver and Bing APIs
//! - **Privacy**: reports keep a bounded excerpt only; prompts and answers never reach the logs
//!
//! ## Example
//!
//! ```rust,no_run
//! use aeo_tracker::{PromptTracker, TrackingRequest};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tracker = PromptTracker::from_env();
//!
//! let mut request = TrackingRequest::new("best running shoes", "https://acmeshoes.com");
//! request.llm_sources = vec!["gpt".to_string(), "gemini".to_string()];
//! request.search_engines = vec!["google".to_string()];
//!
//! for report in tracker.track(&request).await? {
//!     println!("{}: {}", report.query, report.share_of_model_score);
//! }
//! # Ok(())
//! # }
//! ```

// Allow missing errors documentation - errors are self-documenting via type signatures
#![allow(clippy::missing_errors_doc)]

// Logging utilities (re-exports tracing with log_* naming) - internal only
pub(crate) mod logging;

pub mod config;
pub mod credentials;
pub mod error;
pub mod fallback;
pub mod mention;
pub mod ops;
pub mod providers;
pub mod search;
pub mod tracking;

#[cfg(test)]
pub mod tests;

// Re-export main types
pub use config::{ConfigSource, EnvConfigSource, TrackerConfig};
pub use credentials::{
    capability_report, resolve_all, resolve_credential, AuthMode, CapabilityReport,
    ProviderCredential, ProviderFamily,
};
pub use error::{LlmError, LlmResult, SearchError, TrackerError, TrackerResult};
pub use fallback::{fallback_order, FallbackAnswer, LlmRouter};
pub use mention::{evaluate_mention, extract_brand, normalize_domain, MentionScore, MentionTier};
pub use ops::{classify_error, estimate_cost_usd, summarize_llm_runs, ErrorType, OpsSummary};
pub use providers::{
    AdapterFactory, HttpAdapterFactory, InvokeOptions, ProviderAdapter, ProviderReply,
    ResponseSchema,
};
pub use search::{
    get_rank, SearchEngine, SearchRankProber, SearchRankResult, SearchRankResults,
    SearchResultItem, SearchStatus,
};
pub use tracking::{
    LlmRunRecord, PromptTracker, PromptTrackingReport, TrackingMeta, TrackingRequest,
};
