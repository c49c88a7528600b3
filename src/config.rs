//! Configuration for providers, cost rates, search engines and request limits.
//!
//! Every setting is a plain serde struct with a documented default, so an
//! empty configuration degrades to "provider unavailable" instead of failing.
//! [`TrackerConfig::from_env`] is the only code path that reads process
//! environment variables; everything else receives a [`TrackerConfig`]
//! snapshot through a [`ConfigSource`].

use crate::logging::{log_debug, log_warn};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// Supplies a configuration snapshot for one orchestration call.
///
/// Implementations may re-read their backing store on every call, which lets
/// operators rotate credentials without restarting the process.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> TrackerConfig;
}

/// Re-reads the process environment on every [`ConfigSource::load`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigSource;

impl ConfigSource for EnvConfigSource {
    fn load(&self) -> TrackerConfig {
        TrackerConfig::from_env()
    }
}

impl ConfigSource for TrackerConfig {
    fn load(&self) -> TrackerConfig {
        self.clone()
    }
}

/// Complete configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub openai: OpenAIConfig,
    pub azure_openai: AzureOpenAIConfig,
    pub gemini: GeminiConfig,
    pub perplexity: PerplexityConfig,
    pub cost_rates: CostRates,
    pub search: SearchConfig,
    pub limits: TrackingLimits,
    /// Per-call timeout for LLM HTTP requests
    pub llm_request_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            openai: OpenAIConfig::default(),
            azure_openai: AzureOpenAIConfig::default(),
            gemini: GeminiConfig::default(),
            perplexity: PerplexityConfig::default(),
            cost_rates: CostRates::default(),
            search: SearchConfig::default(),
            limits: TrackingLimits::default(),
            llm_request_timeout: Duration::from_secs(45),
        }
    }
}

/// OpenAI Responses API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Sent only to model families that accept a reasoning hint
    pub reasoning_effort: String,
    pub max_output_tokens: u32,
    /// Upper bound for the single truncation retry
    pub max_output_tokens_ceiling: u32,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            reasoning_effort: "medium".to_string(),
            max_output_tokens: 800,
            max_output_tokens_ceiling: 4_000,
        }
    }
}

/// Azure OpenAI chat-completions configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAIConfig {
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_key: Option<String>,
    /// Bearer token; takes precedence over `api_key`
    pub access_token: Option<String>,
    pub api_version: String,
}

impl Default for AzureOpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: None,
            api_key: None,
            access_token: None,
            api_version: "2024-10-21".to_string(),
        }
    }
}

/// Gemini generateContent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub thinking_budget: u32,
    /// Vertex markers; presence selects OAuth mode, which cannot generate text here
    pub vertex_project_id: Option<String>,
    pub application_credentials: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            thinking_budget: 0,
            vertex_project_id: None,
            application_credentials: None,
        }
    }
}

/// Perplexity chat-completions configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerplexityConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.perplexity.ai".to_string(),
            model: "sonar".to_string(),
        }
    }
}

/// Estimated USD per 1000 characters (prompt + response). Zero disables estimation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    pub gpt: f64,
    pub gemini: f64,
    pub perplexity: f64,
}

/// Search-rank probing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Feature toggle; when set every engine reports `disabled`
    pub disabled: bool,
    /// Engines this deployment offers, lowercase
    pub engines: Vec<String>,
    pub google_base_url: String,
    /// Hard wall-clock limit for one scrape, already clamped to `[8s, 80s]`
    pub google_timeout: Duration,
    /// Page-load timeout handed to the renderer
    pub google_page_load_timeout: Duration,
    pub http_timeout: Duration,
    pub bing_api_key: Option<String>,
    pub bing_endpoint: String,
    pub naver_client_id: Option<String>,
    pub naver_client_secret: Option<String>,
    pub naver_endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            engines: vec!["google".to_string(), "naver".to_string()],
            google_base_url: "https://www.google.com".to_string(),
            google_timeout: Duration::from_secs(DEFAULT_GOOGLE_TIMEOUT_SECS),
            google_page_load_timeout: Duration::from_secs(12),
            http_timeout: Duration::from_secs(25),
            bing_api_key: None,
            bing_endpoint: "https://api.bing.microsoft.com/v7.0/search".to_string(),
            naver_client_id: None,
            naver_client_secret: None,
            naver_endpoint: "https://openapi.naver.com/v1/search/webkr.json".to_string(),
        }
    }
}

const DEFAULT_GOOGLE_TIMEOUT_SECS: u64 = 20;
const MIN_GOOGLE_TIMEOUT_SECS: u64 = 8;
const MAX_GOOGLE_TIMEOUT_SECS: u64 = 80;

/// Clamp a configured scrape timeout into the supported window.
pub fn clamp_google_timeout(seconds: u64) -> Duration {
    Duration::from_secs(seconds.clamp(MIN_GOOGLE_TIMEOUT_SECS, MAX_GOOGLE_TIMEOUT_SECS))
}

/// Request-construction limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingLimits {
    /// Allow-list of LLM sources a request may select
    pub llm_sources: Vec<String>,
    pub max_queries: usize,
}

impl Default for TrackingLimits {
    fn default() -> Self {
        Self {
            llm_sources: vec![
                "gpt".to_string(),
                "gemini".to_string(),
                "perplexity".to_string(),
            ],
            max_queries: 5,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    /// This is the ONLY method that should access environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a snapshot from any key/value source. Blank values count as unset
    /// and unparseable numbers fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);
        let defaults = Self::default();

        let openai = OpenAIConfig {
            api_key: env.string("OPENAI_API_KEY"),
            base_url: env.url_or("OPENAI_BASE_URL", &defaults.openai.base_url),
            model: env.string_or("OPENAI_MODEL", &defaults.openai.model),
            reasoning_effort: env
                .string_or("OPENAI_REASONING_EFFORT", &defaults.openai.reasoning_effort)
                .to_lowercase(),
            max_output_tokens: env.parse_or(
                "OPENAI_MAX_OUTPUT_TOKENS",
                defaults.openai.max_output_tokens,
            ),
            max_output_tokens_ceiling: env.parse_or(
                "OPENAI_MAX_OUTPUT_TOKENS_CEILING",
                defaults.openai.max_output_tokens_ceiling,
            ),
        };

        let azure_openai = AzureOpenAIConfig {
            endpoint: env
                .string("AZURE_OPENAI_ENDPOINT")
                .map(|url| url.trim_end_matches('/').to_string()),
            deployment: env.string("AZURE_OPENAI_DEPLOYMENT"),
            api_key: env.string("AZURE_OPENAI_API_KEY"),
            access_token: env.string("AZURE_OPENAI_ACCESS_TOKEN"),
            api_version: env.string_or(
                "AZURE_OPENAI_API_VERSION",
                &defaults.azure_openai.api_version,
            ),
        };

        let gemini = GeminiConfig {
            api_key: env
                .string("GEMINI_API_KEY")
                .or_else(|| env.string("GOOGLE_API_KEY")),
            base_url: env.url_or("GEMINI_BASE_URL", &defaults.gemini.base_url),
            model: env.string_or("GEMINI_MODEL", &defaults.gemini.model),
            thinking_budget: env
                .parse_or("GEMINI_THINKING_BUDGET", defaults.gemini.thinking_budget),
            vertex_project_id: env.string("VERTEX_PROJECT_ID"),
            application_credentials: env.string("GOOGLE_APPLICATION_CREDENTIALS"),
        };

        let perplexity = PerplexityConfig {
            api_key: env.string("PERPLEXITY_API_KEY"),
            base_url: env.url_or("PERPLEXITY_BASE_URL", &defaults.perplexity.base_url),
            model: env.string_or("PERPLEXITY_MODEL", &defaults.perplexity.model),
        };

        let cost_rates = CostRates {
            gpt: env.rate("EST_COST_USD_PER_1K_CHARS_GPT"),
            gemini: env.rate("EST_COST_USD_PER_1K_CHARS_GEMINI"),
            perplexity: env.rate("EST_COST_USD_PER_1K_CHARS_PERPLEXITY"),
        };

        let search = SearchConfig {
            disabled: env.flag("SEARCH_RANK_TEMP_DISABLED"),
            engines: env
                .list("SEARCH_ENGINES")
                .unwrap_or_else(|| defaults.search.engines.clone()),
            google_base_url: env
                .url_or("GOOGLE_SEARCH_BASE_URL", &defaults.search.google_base_url),
            google_timeout: clamp_google_timeout(
                env.parse_or("GOOGLE_SEARCH_TIMEOUT_SEC", DEFAULT_GOOGLE_TIMEOUT_SECS),
            ),
            google_page_load_timeout: defaults.search.google_page_load_timeout,
            http_timeout: Duration::from_secs(env.parse_or("SEARCH_HTTP_TIMEOUT_SEC", 25)),
            bing_api_key: env.string("BING_SEARCH_API_KEY"),
            bing_endpoint: env
                .string_or("BING_SEARCH_ENDPOINT", &defaults.search.bing_endpoint),
            naver_client_id: env.string("NAVER_CLIENT_ID"),
            naver_client_secret: env.string("NAVER_CLIENT_SECRET"),
            naver_endpoint: env
                .string_or("NAVER_SEARCH_ENDPOINT", &defaults.search.naver_endpoint),
        };

        let limits = TrackingLimits {
            llm_sources: env
                .list("PROMPT_TRACKING_LLM_SOURCES")
                .unwrap_or_else(|| defaults.limits.llm_sources.clone()),
            max_queries: env.parse_or("PROMPT_TRACKING_MAX_QUERIES", defaults.limits.max_queries),
        };

        let config = Self {
            openai,
            azure_openai,
            gemini,
            perplexity,
            cost_rates,
            search,
            limits,
            llm_request_timeout: Duration::from_secs(env.parse_or("LLM_REQUEST_TIMEOUT_SEC", 45)),
        };

        log_debug!(
            has_openai_key = config.openai.api_key.is_some(),
            has_azure_endpoint = config.azure_openai.endpoint.is_some(),
            has_gemini_key = config.gemini.api_key.is_some(),
            has_perplexity_key = config.perplexity.api_key.is_some(),
            search_disabled = config.search.disabled,
            search_engines = ?config.search.engines,
            "Tracker configuration loaded"
        );

        config
    }
}

/// Typed accessors over a raw key lookup
struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    fn url_or(&self, key: &str, default: &str) -> String {
        self.string_or(key, default).trim_end_matches('/').to_string()
    }

    fn parse_or<T>(&self, key: &str, default: T) -> T
    where
        T: std::str::FromStr + Copy + Debug,
    {
        match self.string(key) {
            None => default,
            Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
                log_warn!(
                    key = key,
                    default = ?default,
                    "Unparseable configuration value, using default"
                );
                default
            }),
        }
    }

    /// Cost rate in USD; only finite, non-negative values are accepted.
    fn rate(&self, key: &str) -> f64 {
        let rate: f64 = self.parse_or(key, 0.0);
        if rate.is_finite() && rate >= 0.0 {
            rate
        } else {
            log_warn!(key = key, "Cost rate must be finite and non-negative, using 0");
            0.0
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.string(key)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .string(key)?
            .split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect();
        (!items.is_empty()).then_some(items)
    }
}
