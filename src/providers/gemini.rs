//! Google Gemini adapter (`generateContent` REST API, API-key auth)
//!
//! The key travels only as the `key` query parameter; transport errors are
//! stripped of their URL before they can reach a log line or report.

use super::http::{json_headers, post_json};
use super::{InvokeOptions, ProviderAdapter, ProviderReply};
use crate::config::GeminiConfig;
use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "gemini";
const TEMPERATURE: f64 = 0.2;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    pub thinking_config: ThinkingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// All text parts of the first candidate, concatenated.
    pub fn first_candidate_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct GeminiAdapter {
    client: reqwest::Client,
    config: GeminiConfig,
    api_key: String,
    timeout: Duration,
}

impl GeminiAdapter {
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigurationError`] without an API key; Vertex
    /// OAuth credentials cannot drive this adapter.
    pub fn new(
        client: reqwest::Client,
        config: GeminiConfig,
        timeout: Duration,
    ) -> LlmResult<Self> {
        let Some(api_key) = config.api_key.clone() else {
            return Err(LlmError::configuration_error(
                "GEMINI_API_KEY/GOOGLE_API_KEY missing",
            ));
        };
        Ok(Self {
            client,
            config,
            api_key,
            timeout,
        })
    }

    fn build_request(&self, prompt: &str, options: &InvokeOptions) -> GenerateContentRequest {
        let schema = options.response_schema.as_ref();
        GenerateContentRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: options.max_output_tokens,
                thinking_config: ThinkingConfig {
                    thinking_budget: self.config.thinking_budget,
                },
                response_mime_type: schema.map(|_| "application/json".to_string()),
                response_json_schema: schema.map(|schema| schema.schema.clone()),
            },
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    async fn invoke(&self, prompt: &str, options: &InvokeOptions) -> LlmResult<ProviderReply> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let request = self.build_request(prompt, options);

        let response: GenerateContentResponse = post_json(
            &self.client,
            PROVIDER,
            &url,
            &[("key", self.api_key.as_str())],
            json_headers(),
            &request,
            self.timeout,
        )
        .await
        .map_err(|failure| failure.into_llm_error(PROVIDER))?;

        log_debug!(
            provider = PROVIDER,
            model = %self.config.model,
            candidates = response.candidates.len(),
            finish_reason = ?response.candidates.first().and_then(|c| c.finish_reason.clone()),
            "Gemini response shape"
        );

        Ok(ProviderReply {
            text: response.first_candidate_text(),
            reference_url: None,
        })
    }
}
