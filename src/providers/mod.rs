//! LLM provider adapters
//!
//! One adapter per wire protocol, all behind [`ProviderAdapter`]:
//!
//! - **openai**: OpenAI Responses API (`/v1/responses`)
//! - **azure**: Azure OpenAI chat completions on a named deployment
//! - **gemini**: Google `generateContent` with an API key
//! - **perplexity**: Perplexity chat completions
//! - **openai_shared**: wire types shared by the three OpenAI-shaped adapters
//!
//! ## Architecture
//!
//! ```text
//! credentials::ProviderCredential
//!          |
//!   AdapterFactory::create      <- picks the variant from the auth mode
//!          |
//!   Box<dyn ProviderAdapter>    <- invoke(prompt, options) -> ProviderReply
//!          |
//!     http::post_json           <- timeouts, status mapping, redaction
//! ```

pub mod azure;
pub mod gemini;
pub(crate) mod http;
pub mod openai;
pub mod openai_shared;
pub mod perplexity;

pub use azure::AzureOpenAIAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAIResponsesAdapter;
pub use perplexity::PerplexityAdapter;

use crate::config::TrackerConfig;
use crate::credentials::{AuthMode, ProviderCredential};
use crate::error::{LlmError, LlmResult};
use serde::{Deserialize, Serialize};

/// Strict JSON-schema constraint on the answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

impl ResponseSchema {
    pub fn strict(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }
}

/// Per-call knobs every adapter understands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeOptions {
    pub response_schema: Option<ResponseSchema>,
    /// Output budget; adapters fall back to their configured default
    pub max_output_tokens: Option<u32>,
}

/// What an adapter hands back. `text` may be blank; the caller decides
/// whether that counts as a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderReply {
    pub text: String,
    pub reference_url: Option<String>,
}

/// One LLM wire protocol.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable adapter name used in logs and error messages (`openai`, `azure_openai`, ...)
    fn name(&self) -> &'static str;

    /// Model identifier sent on the wire
    fn model(&self) -> String;

    async fn invoke(&self, prompt: &str, options: &InvokeOptions) -> LlmResult<ProviderReply>;
}

/// Builds the adapter matching a resolved credential.
#[cfg_attr(test, mockall::automock)]
pub trait AdapterFactory: Send + Sync {
    fn create(
        &self,
        credential: &ProviderCredential,
        config: &TrackerConfig,
    ) -> LlmResult<Box<dyn ProviderAdapter>>;
}

/// Production factory; all adapters share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpAdapterFactory {
    client: reqwest::Client,
}

impl HttpAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn create(
        &self,
        credential: &ProviderCredential,
        config: &TrackerConfig,
    ) -> LlmResult<Box<dyn ProviderAdapter>> {
        let client = self.client.clone();
        let timeout = config.llm_request_timeout;

        let adapter: Box<dyn ProviderAdapter> = match credential.mode {
            AuthMode::OpenaiApiKey => Box::new(OpenAIResponsesAdapter::new(
                client,
                config.openai.clone(),
                timeout,
            )?),
            AuthMode::AzureOpenaiApiKey | AuthMode::AzureOpenaiOauth => Box::new(
                AzureOpenAIAdapter::new(client, config.azure_openai.clone(), timeout)?,
            ),
            AuthMode::GeminiApiKey => {
                Box::new(GeminiAdapter::new(client, config.gemini.clone(), timeout)?)
            }
            AuthMode::PerplexityApiKey => Box::new(PerplexityAdapter::new(
                client,
                config.perplexity.clone(),
                timeout,
            )?),
            AuthMode::VertexAiOauth | AuthMode::Unavailable => {
                return Err(LlmError::provider_unavailable(
                    credential.provider.as_str(),
                    credential
                        .reason
                        .clone()
                        .unwrap_or_else(|| "no adapter for this credential mode".to_string()),
                ));
            }
        };

        Ok(adapter)
    }
}
