//! Perplexity chat-completions adapter

use super::http::{bearer_headers, post_json};
use super::openai_shared::{
    chat_response_format, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};
use super::{InvokeOptions, ProviderAdapter, ProviderReply};
use crate::config::PerplexityConfig;
use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use std::time::Duration;

const PROVIDER: &str = "perplexity";
const TEMPERATURE: f64 = 0.2;

#[derive(Debug)]
pub struct PerplexityAdapter {
    client: reqwest::Client,
    config: PerplexityConfig,
    timeout: Duration,
}

impl PerplexityAdapter {
    pub fn new(
        client: reqwest::Client,
        config: PerplexityConfig,
        timeout: Duration,
    ) -> LlmResult<Self> {
        if config.api_key.is_none() {
            return Err(LlmError::configuration_error("PERPLEXITY_API_KEY missing"));
        }
        Ok(Self {
            client,
            config,
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for PerplexityAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    async fn invoke(&self, prompt: &str, options: &InvokeOptions) -> LlmResult<ProviderReply> {
        let request = ChatCompletionRequest {
            model: Some(self.config.model.clone()),
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(TEMPERATURE),
            max_tokens: options.max_output_tokens,
            response_format: options.response_schema.as_ref().map(chat_response_format),
        };
        let url = format!("{}/chat/completions", self.config.base_url);
        let headers = bearer_headers(
            PROVIDER,
            self.config.api_key.as_deref().unwrap_or_default(),
        )?;

        let response: ChatCompletionResponse =
            post_json(&self.client, PROVIDER, &url, &[], headers, &request, self.timeout)
                .await
                .map_err(|failure| failure.into_llm_error(PROVIDER))?;

        log_debug!(
            provider = PROVIDER,
            model = %self.config.model,
            choices = response.choices.len(),
            has_id = response.id.is_some(),
            "Perplexity response shape"
        );

        if response.choices.is_empty() {
            return Ok(ProviderReply::default());
        }

        let reference_url = response
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}/chat/completions/{id}", self.config.base_url));

        Ok(ProviderReply {
            text: response.first_content(),
            reference_url,
        })
    }
}
