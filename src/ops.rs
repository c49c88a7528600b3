//! Error classification, cost estimation and run summaries
//!
//! Classification works on stored message strings, not on error values, so
//! it applies equally to fresh errors and to reasons read back from a
//! persisted report.

use crate::config::CostRates;
use crate::credentials::ProviderFamily;
use crate::tracking::LlmRunRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Fixed taxonomy for failed LLM calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Timeout,
    RateLimit,
    Auth,
    Network,
    ProviderUnavailable,
    Unknown,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Timeout => "timeout",
            ErrorType::RateLimit => "rate_limit",
            ErrorType::Auth => "auth",
            ErrorType::Network => "network",
            ErrorType::ProviderUnavailable => "provider_unavailable",
            ErrorType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive keyword match, first rule wins.
///
/// ```rust
/// use aeo_tracker::ops::{classify_error, ErrorType};
///
/// assert_eq!(classify_error("Connection timed out after 30s"), ErrorType::Timeout);
/// assert_eq!(classify_error("401 Unauthorized: invalid api key"), ErrorType::Auth);
/// assert_eq!(classify_error("something odd"), ErrorType::Unknown);
/// ```
pub fn classify_error(message: &str) -> ErrorType {
    let text = message.to_lowercase();
    let has = |needle: &str| text.contains(needle);

    if has("timeout") || has("timed out") {
        ErrorType::Timeout
    } else if has("429") || has("rate") {
        ErrorType::RateLimit
    } else if has("401") || has("403") || has("api key") || has("token") {
        ErrorType::Auth
    } else if has("connection") || has("network") || has("dns") {
        ErrorType::Network
    } else if has("missing") || has("not available") {
        ErrorType::ProviderUnavailable
    } else {
        ErrorType::Unknown
    }
}

/// Per-1000-character rate for a provider name; unknown names cost nothing.
pub fn rate_for(provider: &str, rates: &CostRates) -> f64 {
    match provider.parse::<ProviderFamily>() {
        Ok(ProviderFamily::Gpt) => rates.gpt,
        Ok(ProviderFamily::Gemini) => rates.gemini,
        Ok(ProviderFamily::Perplexity) => rates.perplexity,
        Err(_) => 0.0,
    }
}

/// `(chars(prompt) + chars(response)) / 1000 * rate`, rounded to 6 decimals.
pub fn estimate_cost_usd(provider: &str, prompt: &str, response: &str, rates: &CostRates) -> f64 {
    let rate = rate_for(provider, rates);
    let total_chars = prompt.chars().count() + response.chars().count();
    if total_chars == 0 || !rate.is_finite() || rate <= 0.0 {
        return 0.0;
    }
    round_usd(total_chars as f64 / 1000.0 * rate)
}

pub(crate) fn round_usd(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Aggregate statistics over one report's LLM entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpsSummary {
    pub success_count: usize,
    pub failure_count: usize,
    pub total_latency_ms: u64,
    /// Integer mean over successful entries only
    pub avg_latency_ms: u64,
    pub providers_used: Vec<String>,
    pub models_used: Vec<String>,
    pub estimated_cost_usd_total: f64,
}

/// Failures are `not_available` entries; latency counts successes only,
/// cost counts every entry.
pub fn summarize_llm_runs(records: &[LlmRunRecord]) -> OpsSummary {
    let successes: Vec<&LlmRunRecord> = records.iter().filter(|r| r.is_success()).collect();

    let total_latency_ms: u64 = successes.iter().map(|r| r.latency_ms).sum();
    let avg_latency_ms = if successes.is_empty() {
        0
    } else {
        total_latency_ms / successes.len() as u64
    };

    let providers_used: BTreeSet<String> = successes
        .iter()
        .filter_map(|r| r.provider_used.map(|p| p.as_str().to_string()))
        .collect();
    let models_used: BTreeSet<String> = successes
        .iter()
        .filter_map(|r| r.model.clone())
        .filter(|model| !model.is_empty())
        .collect();

    OpsSummary {
        success_count: successes.len(),
        failure_count: records.len() - successes.len(),
        total_latency_ms,
        avg_latency_ms,
        providers_used: providers_used.into_iter().collect(),
        models_used: models_used.into_iter().collect(),
        estimated_cost_usd_total: round_usd(records.iter().map(|r| r.estimated_cost_usd).sum()),
    }
}
