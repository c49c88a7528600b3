//! Shared fixtures for unit tests
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

#![allow(dead_code)]

use crate::config::TrackerConfig;
use crate::fallback::FallbackAnswer;
use crate::credentials::ProviderFamily;
use crate::providers::{MockProviderAdapter, ProviderAdapter, ProviderReply};
use crate::tracking::LlmRunRecord;
use crate::mention::MentionTier;
use std::collections::HashMap;

/// Configuration built from explicit key/value pairs, never from the process environment.
pub fn config_from_pairs(pairs: &[(&str, &str)]) -> TrackerConfig {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    TrackerConfig::from_lookup(move |key| values.get(key).cloned())
}

/// No provider credentials at all
pub fn empty_config() -> TrackerConfig {
    config_from_pairs(&[])
}

pub fn openai_and_gemini_config() -> TrackerConfig {
    config_from_pairs(&[("OPENAI_API_KEY", "sk-test"), ("GEMINI_API_KEY", "gm-test")])
}

pub fn gemini_only_config() -> TrackerConfig {
    config_from_pairs(&[("GEMINI_API_KEY", "gm-test")])
}

/// Adapter that always answers with `text`
pub fn answering_adapter(name: &'static str, text: &str) -> Box<dyn ProviderAdapter> {
    let text = text.to_string();
    let mut adapter = MockProviderAdapter::new();
    adapter.expect_name().return_const(name);
    adapter.expect_model().return_const(format!("{name}-model"));
    adapter.expect_invoke().returning(move |_, _| {
        Ok(ProviderReply {
            text: text.clone(),
            reference_url: None,
        })
    });
    Box::new(adapter)
}

pub fn success_record(
    source: &str,
    provider: ProviderFamily,
    tier: MentionTier,
    latency_ms: u64,
) -> LlmRunRecord {
    LlmRunRecord {
        source: source.to_string(),
        provider_used: Some(provider),
        model: Some(format!("{provider}-model")),
        tier,
        score: tier.score(),
        reason: "scored".to_string(),
        latency_ms,
        error_type: None,
        estimated_cost_usd: 0.0,
        response_excerpt: "answer".to_string(),
        response_share_url: None,
    }
}

pub fn failed_record(source: &str, reason: &str) -> LlmRunRecord {
    LlmRunRecord {
        source: source.to_string(),
        provider_used: None,
        model: None,
        tier: MentionTier::NotAvailable,
        score: 0,
        reason: reason.to_string(),
        latency_ms: 0,
        error_type: Some(crate::ops::classify_error(reason)),
        estimated_cost_usd: 0.0,
        response_excerpt: String::new(),
        response_share_url: None,
    }
}

pub fn answer(provider: ProviderFamily, text: &str) -> FallbackAnswer {
    FallbackAnswer {
        text: text.to_string(),
        provider_used: provider,
        model: format!("{provider}-model"),
        latency_ms: 42,
        reference_url: None,
    }
}
