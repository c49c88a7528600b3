//! Azure OpenAI adapter
//!
//! Chat completions against `{endpoint}/openai/deployments/{deployment}`.
//! A bearer access token wins over the static `api-key` header when both are
//! configured.

use super::http::{bearer_headers, json_headers, post_json};
use super::openai_shared::{
    chat_response_format, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};
use super::{InvokeOptions, ProviderAdapter, ProviderReply};
use crate::config::AzureOpenAIConfig;
use crate::error::{LlmError, LlmResult};
use crate::logging::log_debug;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;

const PROVIDER: &str = "azure_openai";
const DEFAULT_MAX_TOKENS: u32 = 800;
const TEMPERATURE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AzureAuth {
    AccessToken(String),
    ApiKey(String),
}

#[derive(Debug)]
pub struct AzureOpenAIAdapter {
    client: reqwest::Client,
    url: String,
    deployment: String,
    auth: AzureAuth,
    timeout: Duration,
}

impl AzureOpenAIAdapter {
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigurationError`] when endpoint, deployment, or
    /// both credentials are missing.
    pub fn new(
        client: reqwest::Client,
        config: AzureOpenAIConfig,
        timeout: Duration,
    ) -> LlmResult<Self> {
        let (Some(endpoint), Some(deployment)) = (config.endpoint, config.deployment) else {
            return Err(LlmError::configuration_error(
                "Azure OpenAI endpoint/deployment missing",
            ));
        };

        let auth = match (config.access_token, config.api_key) {
            (Some(access_token), _) => AzureAuth::AccessToken(access_token),
            (None, Some(api_key)) => AzureAuth::ApiKey(api_key),
            (None, None) => {
                return Err(LlmError::configuration_error(
                    "Azure OpenAI credential missing",
                ))
            }
        };

        let url = format!(
            "{}/openai/deployments/{deployment}/chat/completions",
            endpoint.trim_end_matches('/')
        );

        log_debug!(
            provider = PROVIDER,
            deployment = %deployment,
            api_version = %config.api_version,
            bearer_auth = matches!(auth, AzureAuth::AccessToken(_)),
            "Creating Azure OpenAI adapter"
        );

        Ok(Self {
            client,
            url: format!("{url}?api-version={}", config.api_version),
            deployment,
            auth,
            timeout,
        })
    }

    fn headers(&self) -> LlmResult<HeaderMap> {
        match &self.auth {
            AzureAuth::AccessToken(token) => bearer_headers(PROVIDER, token),
            AzureAuth::ApiKey(key) => {
                let mut headers = json_headers();
                headers.insert(
                    "api-key",
                    HeaderValue::from_str(key).map_err(|_| {
                        LlmError::configuration_error(
                            "Azure OpenAI key contains invalid header characters",
                        )
                    })?,
                );
                Ok(headers)
            }
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for AzureOpenAIAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> String {
        self.deployment.clone()
    }

    async fn invoke(&self, prompt: &str, options: &InvokeOptions) -> LlmResult<ProviderReply> {
        let request = ChatCompletionRequest {
            model: None,
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(TEMPERATURE),
            max_tokens: Some(options.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
            response_format: options.response_schema.as_ref().map(chat_response_format),
        };

        let response: ChatCompletionResponse = post_json(
            &self.client,
            PROVIDER,
            &self.url,
            &[],
            self.headers()?,
            &request,
            self.timeout,
        )
        .await
        .map_err(|failure| failure.into_llm_error(PROVIDER))?;

        log_debug!(
            provider = PROVIDER,
            deployment = %self.deployment,
            choices = response.choices.len(),
            finish_reason = ?response.choices.first().and_then(|c| c.finish_reason.clone()),
            "Azure OpenAI response shape"
        );

        Ok(ProviderReply {
            text: response.first_content(),
            reference_url: None,
        })
    }
}
