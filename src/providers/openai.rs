//! OpenAI Responses API adapter
//!
//! Sends one free-text prompt to `/v1/responses`. Two provider behaviors need
//! extra handling:
//!
//! - Reasoning-capable models accept a `reasoning.effort` hint, but some
//!   deployments reject it. A 400 naming the parameter triggers one resend
//!   without the hint.
//! - A response cut off by `max_output_tokens` before any text was produced
//!   (reasoning consumed the whole budget) triggers one resend with a larger
//!   budget and `low` effort.

use super::http::{bearer_headers, post_json, HttpFailure};
use super::openai_shared::{
    responses_text_config, ReasoningConfig, ResponsesRequest, ResponsesResponse,
};
use super::{InvokeOptions, ProviderAdapter, ProviderReply};
use crate::config::OpenAIConfig;
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_warn};
use reqwest::header::HeaderMap;
use std::time::Duration;

const PROVIDER: &str = "openai";
const REASONING_MODEL_PREFIXES: [&str; 4] = ["o1", "o3", "o4", "gpt-5"];
const REASONING_REJECTION_MARKERS: [&str; 2] = ["reasoning", "unsupported_parameter"];
const TRUNCATION_BUDGET_MULTIPLIER: u32 = 3;
const TRUNCATION_RETRY_EFFORT: &str = "low";

/// Whether the model name signals support for `reasoning.effort`.
pub fn is_reasoning_model(model: &str) -> bool {
    let model = model.trim().to_lowercase();
    REASONING_MODEL_PREFIXES
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

/// Budget for the truncation retry, or `None` when the ceiling leaves no room.
pub fn expanded_budget(current: u32, ceiling: u32) -> Option<u32> {
    let expanded = current.saturating_mul(TRUNCATION_BUDGET_MULTIPLIER).min(ceiling);
    (expanded > current).then_some(expanded)
}

#[derive(Debug)]
pub struct OpenAIResponsesAdapter {
    client: reqwest::Client,
    config: OpenAIConfig,
    timeout: Duration,
}

impl OpenAIResponsesAdapter {
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigurationError`] if no API key is configured.
    pub fn new(
        client: reqwest::Client,
        config: OpenAIConfig,
        timeout: Duration,
    ) -> LlmResult<Self> {
        if config.api_key.is_none() {
            return Err(LlmError::configuration_error("OPENAI_API_KEY missing"));
        }

        log_debug!(
            provider = PROVIDER,
            base_url = %config.base_url,
            model = %config.model,
            reasoning_model = is_reasoning_model(&config.model),
            "Creating OpenAI Responses adapter"
        );

        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    fn headers(&self) -> LlmResult<HeaderMap> {
        bearer_headers(PROVIDER, self.config.api_key.as_deref().unwrap_or_default())
    }

    fn build_request(
        &self,
        prompt: &str,
        options: &InvokeOptions,
        budget: u32,
        effort: Option<&str>,
    ) -> ResponsesRequest {
        ResponsesRequest {
            model: self.config.model.clone(),
            input: prompt.to_string(),
            max_output_tokens: budget,
            reasoning: effort.map(|effort| ReasoningConfig {
                effort: effort.to_string(),
            }),
            text: options.response_schema.as_ref().map(responses_text_config),
        }
    }

    async fn send(&self, request: &ResponsesRequest) -> Result<ResponsesResponse, HttpFailure> {
        let url = format!("{}/v1/responses", self.config.base_url);
        let headers = self.headers().map_err(HttpFailure::Transport)?;
        post_json(
            &self.client,
            PROVIDER,
            &url,
            &[],
            headers,
            request,
            self.timeout,
        )
        .await
    }

    /// Send, dropping the reasoning hint once if the provider rejects it.
    /// A dropped hint stays dropped on `request` for later attempts.
    async fn send_with_reasoning_fallback(
        &self,
        request: &mut ResponsesRequest,
    ) -> LlmResult<ResponsesResponse> {
        match self.send(request).await {
            Ok(response) => Ok(response),
            Err(HttpFailure::Status(error))
                if error.status == 400
                    && request.reasoning.is_some()
                    && error.mentions_any(&REASONING_REJECTION_MARKERS) =>
            {
                log_warn!(
                    provider = PROVIDER,
                    model = %request.model,
                    error_param = ?error.details.param,
                    error_code = ?error.details.code,
                    "Reasoning parameter rejected, resending without it"
                );
                request.reasoning = None;
                self.send(request)
                    .await
                    .map_err(|failure| failure.into_llm_error(PROVIDER))
            }
            Err(failure) => Err(failure.into_llm_error(PROVIDER)),
        }
    }

    fn log_response_shape(&self, response: &ResponsesResponse, text_len: usize, attempt: u32) {
        log_debug!(
            provider = PROVIDER,
            attempt = attempt,
            status = ?response.status,
            incomplete_reason = ?response
                .incomplete_details
                .as_ref()
                .and_then(|d| d.reason.clone()),
            has_output_text = response.output_text.is_some(),
            output_items = response.output.len(),
            output_types = ?response.output_types(),
            choices = response.choices.len(),
            text_chars = text_len,
            "OpenAI response shape"
        );
    }

    fn reference_url(&self, response: &ResponsesResponse) -> Option<String> {
        response
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}/v1/responses/{id}", self.config.base_url))
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAIResponsesAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    async fn invoke(&self, prompt: &str, options: &InvokeOptions) -> LlmResult<ProviderReply> {
        let budget = options
            .max_output_tokens
            .unwrap_or(self.config.max_output_tokens);
        let effort = is_reasoning_model(&self.config.model)
            .then_some(self.config.reasoning_effort.as_str());

        let mut request = self.build_request(prompt, options, budget, effort);
        let mut response = self.send_with_reasoning_fallback(&mut request).await?;
        let mut text = response.extract_text();
        self.log_response_shape(&response, text.chars().count(), 1);

        if text.is_empty() && response.truncated_by_budget() {
            if let Some(expanded) =
                expanded_budget(budget, self.config.max_output_tokens_ceiling)
            {
                log_warn!(
                    provider = PROVIDER,
                    model = %self.config.model,
                    previous_budget = budget,
                    expanded_budget = expanded,
                    "Output truncated before any text, retrying with larger budget"
                );
                request.max_output_tokens = expanded;
                if request.reasoning.is_some() {
                    request.reasoning = Some(ReasoningConfig {
                        effort: TRUNCATION_RETRY_EFFORT.to_string(),
                    });
                }
                response = self.send_with_reasoning_fallback(&mut request).await?;
                text = response.extract_text();
                self.log_response_shape(&response, text.chars().count(), 2);
            }
        }

        Ok(ProviderReply {
            reference_url: self.reference_url(&response),
            text,
        })
    }
}
