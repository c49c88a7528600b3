//! Provider fallback orchestration
//!
//! [`LlmRouter::call_with_fallback`] tries the preferred provider family and
//! then its static fallbacks, one attempt each, and returns the first
//! non-blank answer. Credentials are re-resolved from the [`ConfigSource`] on
//! every call so rotated keys take effect without a restart.
//!
//! Success and failure are logged with provider, model and latency only;
//! prompt and answer text never reach a log line.

use crate::config::{ConfigSource, EnvConfigSource, TrackerConfig};
use crate::credentials::{resolve_credential, AuthMode, ProviderCredential, ProviderFamily};
use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_info, log_warn};
use crate::providers::{AdapterFactory, HttpAdapterFactory, InvokeOptions};
use std::sync::Arc;
use std::time::Instant;

const VERTEX_OAUTH_REASON: &str =
    "Vertex OAuth mode detected; set GEMINI_API_KEY or GOOGLE_API_KEY for this build";

/// Ordered candidates for a preferred source. Unknown names get `gpt -> gemini`.
pub fn fallback_order(preferred: &str) -> Vec<ProviderFamily> {
    use ProviderFamily::{Gemini, Gpt, Perplexity};

    match preferred.parse::<ProviderFamily>() {
        Ok(Gpt) => vec![Gpt, Gemini],
        Ok(Gemini) => vec![Gemini, Gpt],
        Ok(Perplexity) => vec![Perplexity, Gemini, Gpt],
        Err(_) => vec![Gpt, Gemini],
    }
}

/// Distinct `(from, to)` hand-offs implied by [`fallback_order`].
pub fn fallback_edges() -> Vec<(ProviderFamily, ProviderFamily)> {
    let mut edges = Vec::new();
    for family in ProviderFamily::ALL {
        for pair in fallback_order(family.as_str()).windows(2) {
            let edge = (pair[0], pair[1]);
            if !edges.contains(&edge) {
                edges.push(edge);
            }
        }
    }
    edges
}

/// Successful answer from one of the candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackAnswer {
    pub text: String,
    pub provider_used: ProviderFamily,
    pub model: String,
    pub latency_ms: u64,
    pub reference_url: Option<String>,
}

/// Routes prompts to provider adapters with static fallback.
#[derive(Clone)]
pub struct LlmRouter {
    config: Arc<dyn ConfigSource>,
    factory: Arc<dyn AdapterFactory>,
}

impl std::fmt::Debug for LlmRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmRouter").finish_non_exhaustive()
    }
}

impl LlmRouter {
    pub fn new(config: Arc<dyn ConfigSource>, factory: Arc<dyn AdapterFactory>) -> Self {
        Self { config, factory }
    }

    /// Environment-backed configuration with real HTTP adapters.
    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvConfigSource), Arc::new(HttpAdapterFactory::new()))
    }

    /// Try `preferred` and its fallbacks; return the first non-blank answer.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::AllProvidersFailed`] naming the last attempted
    /// source and embedding the last failure. Errors from earlier candidates
    /// are logged and swallowed.
    pub async fn call_with_fallback(
        &self,
        prompt: &str,
        preferred: &str,
        options: &InvokeOptions,
    ) -> LlmResult<FallbackAnswer> {
        let config = self.config.load();
        let order = fallback_order(preferred);

        let mut last_error: Option<LlmError> = None;
        let mut last_attempted: Option<ProviderFamily> = None;

        for family in &order {
            let credential = resolve_credential(*family, &config);

            if !credential.available {
                log_debug!(
                    source = %family,
                    preferred = preferred,
                    "Skipping provider without credentials"
                );
                // a real failure is more useful than a later skip
                if last_attempted.is_none() {
                    last_error = Some(LlmError::provider_unavailable(
                        family.as_str(),
                        credential.reason.clone().unwrap_or_default(),
                    ));
                }
                continue;
            }

            last_attempted = Some(*family);
            match self.attempt(&credential, &config, prompt, options).await {
                Ok(answer) => return Ok(answer),
                Err(error) => {
                    log_warn!(
                        source = %family,
                        preferred = preferred,
                        error = %error,
                        "LLM call failed, moving to next provider"
                    );
                    last_error = Some(error);
                }
            }
        }

        let last_source = last_attempted
            .or_else(|| order.last().copied())
            .unwrap_or(ProviderFamily::Gpt);
        let last_error = last_error.unwrap_or_else(|| {
            LlmError::provider_unavailable(last_source.as_str(), "no candidate providers")
        });

        Err(LlmError::all_providers_failed(last_source.as_str(), &last_error))
    }

    async fn attempt(
        &self,
        credential: &ProviderCredential,
        config: &TrackerConfig,
        prompt: &str,
        options: &InvokeOptions,
    ) -> LlmResult<FallbackAnswer> {
        if credential.mode == AuthMode::VertexAiOauth {
            return Err(LlmError::provider_unavailable(
                credential.provider.as_str(),
                VERTEX_OAUTH_REASON,
            ));
        }

        let adapter = self.factory.create(credential, config)?;

        let started = Instant::now();
        let reply = adapter.invoke(prompt, options).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if reply.text.trim().is_empty() {
            return Err(LlmError::empty_response(adapter.name()));
        }

        let model = adapter.model();
        log_info!(
            provider = %credential.provider,
            adapter = adapter.name(),
            model = %model,
            latency_ms = latency_ms,
            has_reference_url = reply.reference_url.is_some(),
            "LLM call succeeded"
        );

        Ok(FallbackAnswer {
            text: reply.text,
            provider_used: credential.provider,
            model,
            latency_ms,
            reference_url: reply.reference_url,
        })
    }
}
