//! Shared fixtures for the wiremock-backed integration tests
//!
//! Every helper points a configuration at a `MockServer` base URL so adapters
//! and engines talk to the mock instead of the real provider.
//!
//! IMPORTANT: These helpers are test-only and should NEVER be used in production code.

// Each integration test binary uses a different subset of these helpers
#![allow(dead_code)]

use aeo_tracker::config::{
    AzureOpenAIConfig, GeminiConfig, OpenAIConfig, PerplexityConfig, SearchConfig, TrackerConfig,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::ResponseTemplate;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const NAVER_PATH: &str = "/v1/search/webkr.json";
pub const BING_PATH: &str = "/v7.0/search";

pub fn openai_config(base_url: &str) -> OpenAIConfig {
    OpenAIConfig {
        api_key: Some("sk-test-openai".to_string()),
        base_url: base_url.to_string(),
        ..OpenAIConfig::default()
    }
}

/// OpenAI configuration for a model family that accepts `reasoning.effort`.
pub fn openai_reasoning_config(base_url: &str) -> OpenAIConfig {
    OpenAIConfig {
        model: "o3-mini".to_string(),
        ..openai_config(base_url)
    }
}

pub fn azure_config(endpoint: &str) -> AzureOpenAIConfig {
    AzureOpenAIConfig {
        endpoint: Some(endpoint.to_string()),
        deployment: Some("prod-gpt4o".to_string()),
        api_key: Some("azure-test-key".to_string()),
        ..AzureOpenAIConfig::default()
    }
}

pub fn gemini_config(base_url: &str) -> GeminiConfig {
    GeminiConfig {
        api_key: Some("AIzaTestGeminiKey".to_string()),
        base_url: base_url.to_string(),
        ..GeminiConfig::default()
    }
}

pub fn perplexity_config(base_url: &str) -> PerplexityConfig {
    PerplexityConfig {
        api_key: Some("pplx-test".to_string()),
        base_url: base_url.to_string(),
        ..PerplexityConfig::default()
    }
}

pub fn search_config(base_url: &str) -> SearchConfig {
    SearchConfig {
        engines: vec![
            "google".to_string(),
            "naver".to_string(),
            "bing".to_string(),
        ],
        google_base_url: base_url.to_string(),
        http_timeout: TEST_TIMEOUT,
        bing_api_key: Some("bing-test-key".to_string()),
        bing_endpoint: format!("{base_url}{BING_PATH}"),
        naver_client_id: Some("naver-id".to_string()),
        naver_client_secret: Some("naver-secret".to_string()),
        naver_endpoint: format!("{base_url}{NAVER_PATH}"),
        ..SearchConfig::default()
    }
}

/// OpenAI, Gemini and every search engine routed to one mock server.
pub fn tracker_config(base_url: &str) -> TrackerConfig {
    TrackerConfig {
        openai: openai_config(base_url),
        gemini: gemini_config(base_url),
        search: search_config(base_url),
        llm_request_timeout: TEST_TIMEOUT,
        ..TrackerConfig::default()
    }
}

pub fn responses_body(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "object": "response",
        "status": "completed",
        "output": [{
            "type": "message",
            "role": "assistant",
            "content": [{"type": "output_text", "text": text}]
        }]
    })
}

/// A Responses API body that ran out of budget before producing text.
pub fn truncated_responses_body(id: &str) -> Value {
    json!({
        "id": id,
        "object": "response",
        "status": "incomplete",
        "incomplete_details": {"reason": "max_output_tokens"},
        "output": [{"type": "reasoning", "content": []}]
    })
}

pub fn chat_body(id: &str, text: &str) -> Value {
    json!({
        "id": id,
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
}

pub fn gemini_body(parts: &[&str]) -> Value {
    let parts: Vec<Value> = parts.iter().map(|text| json!({"text": text})).collect();
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": parts},
            "finishReason": "STOP"
        }]
    })
}

/// OpenAI-style error envelope with the given status.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": {"message": message, "type": "invalid_request_error"}
    }))
}
