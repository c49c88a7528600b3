//! Provider credential resolution
//!
//! Decides, from a configuration snapshot, which LLM provider families are
//! usable and in which authentication mode. Resolution is pure and cheap, so
//! callers recompute it on every orchestration call instead of caching it.

use crate::config::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The three LLM backends a tracking request can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    /// OpenAI-compatible: OpenAI Responses API or an Azure OpenAI deployment
    Gpt,
    Gemini,
    Perplexity,
}

impl ProviderFamily {
    pub const ALL: [ProviderFamily; 3] = [
        ProviderFamily::Gpt,
        ProviderFamily::Gemini,
        ProviderFamily::Perplexity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::Gpt => "gpt",
            ProviderFamily::Gemini => "gemini",
            ProviderFamily::Perplexity => "perplexity",
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gpt" => Ok(ProviderFamily::Gpt),
            "gemini" => Ok(ProviderFamily::Gemini),
            "perplexity" => Ok(ProviderFamily::Perplexity),
            other => Err(format!("Unknown provider family: {other}")),
        }
    }
}

/// How a provider family authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    OpenaiApiKey,
    AzureOpenaiApiKey,
    AzureOpenaiOauth,
    GeminiApiKey,
    VertexAiOauth,
    PerplexityApiKey,
    Unavailable,
}

/// Snapshot of one family's credential state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredential {
    pub provider: ProviderFamily,
    pub mode: AuthMode,
    pub available: bool,
    pub reason: Option<String>,
}

impl ProviderCredential {
    fn usable(provider: ProviderFamily, mode: AuthMode) -> Self {
        Self {
            provider,
            mode,
            available: true,
            reason: None,
        }
    }

    fn unavailable(provider: ProviderFamily, reason: &str) -> Self {
        Self {
            provider,
            mode: AuthMode::Unavailable,
            available: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Resolve one family. API-key modes win over proxy/OAuth modes.
pub fn resolve_credential(family: ProviderFamily, config: &TrackerConfig) -> ProviderCredential {
    match family {
        ProviderFamily::Gpt => resolve_gpt(config),
        ProviderFamily::Gemini => resolve_gemini(config),
        ProviderFamily::Perplexity => resolve_perplexity(config),
    }
}

/// Resolve every family in canonical order.
pub fn resolve_all(config: &TrackerConfig) -> Vec<ProviderCredential> {
    ProviderFamily::ALL
        .iter()
        .map(|family| resolve_credential(*family, config))
        .collect()
}

fn resolve_gpt(config: &TrackerConfig) -> ProviderCredential {
    if config.openai.api_key.is_some() {
        return ProviderCredential::usable(ProviderFamily::Gpt, AuthMode::OpenaiApiKey);
    }

    let azure = &config.azure_openai;
    if azure.endpoint.is_some()
        && azure.deployment.is_some()
        && (azure.api_key.is_some() || azure.access_token.is_some())
    {
        let mode = if azure.access_token.is_some() {
            AuthMode::AzureOpenaiOauth
        } else {
            AuthMode::AzureOpenaiApiKey
        };
        return ProviderCredential::usable(ProviderFamily::Gpt, mode);
    }

    ProviderCredential::unavailable(
        ProviderFamily::Gpt,
        "Set OPENAI_API_KEY or Azure OpenAI credentials",
    )
}

fn resolve_gemini(config: &TrackerConfig) -> ProviderCredential {
    let gemini = &config.gemini;
    if gemini.api_key.is_some() {
        return ProviderCredential::usable(ProviderFamily::Gemini, AuthMode::GeminiApiKey);
    }

    if gemini.vertex_project_id.is_some() && gemini.application_credentials.is_some() {
        return ProviderCredential::usable(ProviderFamily::Gemini, AuthMode::VertexAiOauth);
    }

    ProviderCredential::unavailable(
        ProviderFamily::Gemini,
        "Set GEMINI_API_KEY/GOOGLE_API_KEY or Vertex credentials",
    )
}

fn resolve_perplexity(config: &TrackerConfig) -> ProviderCredential {
    if config.perplexity.api_key.is_some() {
        return ProviderCredential::usable(ProviderFamily::Perplexity, AuthMode::PerplexityApiKey);
    }

    ProviderCredential::unavailable(ProviderFamily::Perplexity, "Set PERPLEXITY_API_KEY")
}

/// Model identifier reported for answers produced under `credential`.
pub fn resolve_model(credential: &ProviderCredential, config: &TrackerConfig) -> String {
    match credential.mode {
        AuthMode::OpenaiApiKey => config.openai.model.clone(),
        AuthMode::AzureOpenaiApiKey | AuthMode::AzureOpenaiOauth => config
            .azure_openai
            .deployment
            .clone()
            .unwrap_or_else(|| "azure-deployment".to_string()),
        _ => match credential.provider {
            ProviderFamily::Gpt => config.openai.model.clone(),
            ProviderFamily::Gemini => config.gemini.model.clone(),
            ProviderFamily::Perplexity => config.perplexity.model.clone(),
        },
    }
}

/// One family's entry in the capability report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapability {
    pub available: bool,
    pub mode: AuthMode,
    pub reason: Option<String>,
    /// Model answers would be recorded under; absent for unavailable families
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_oauth_supported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Operator-facing summary of which providers are configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub providers: BTreeMap<ProviderFamily, ProviderCapability>,
    /// Enabled fallback edges, e.g. `gpt_to_gemini`
    pub fallback: Vec<String>,
}

pub fn capability_report(config: &TrackerConfig) -> CapabilityReport {
    let providers = resolve_all(config)
        .into_iter()
        .map(|credential| {
            let notes = match credential.provider {
                ProviderFamily::Gpt => Some(
                    "ChatGPT subscription OAuth is not a programmatic API credential.".to_string(),
                ),
                ProviderFamily::Gemini => Some(
                    "Gemini consumer subscription OAuth is not a programmatic API credential."
                        .to_string(),
                ),
                ProviderFamily::Perplexity => None,
            };
            let model = credential
                .available
                .then(|| resolve_model(&credential, config));
            let capability = ProviderCapability {
                available: credential.available,
                mode: credential.mode,
                reason: credential.reason,
                model,
                subscription_oauth_supported: notes.as_ref().map(|_| false),
                notes,
            };
            (credential.provider, capability)
        })
        .collect();

    let fallback = crate::fallback::fallback_edges()
        .into_iter()
        .map(|(from, to)| format!("{from}_to_{to}"))
        .collect();

    CapabilityReport {
        providers,
        fallback,
    }
}
