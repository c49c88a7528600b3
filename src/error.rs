//! Error types for provider calls, search probing and request construction.
//!
//! Three error families are defined here:
//! - [`LlmError`]: a single provider attempt failed (network, HTTP status,
//!   empty output, missing credentials) or a whole fallback chain was exhausted
//! - [`SearchError`]: a search engine fetch failed; always reduced to a
//!   sanitized string via [`SearchError::safe_message`] before leaving the crate
//! - [`TrackerError`]: the tracking request itself could not be constructed
//!
//! Only [`TrackerError`] is surfaced to callers as a hard failure. Provider and
//! engine failures are recovered locally and recorded in the report.
//!
//! # Display strings
//!
//! Every `Display` output is safe to persist: no credentials, no URLs carrying
//! API keys, no stack traces. The strings also carry the keywords that
//! [`crate::ops::classify_error`] matches on (`timeout`, `429`, `401`,
//! `connection`, `not available`), so the classifier works on stored messages.
//!
//! ```rust
//! use aeo_tracker::LlmError;
//! use aeo_tracker::ops::{classify_error, ErrorType};
//!
//! let err = LlmError::timeout("gpt", 45);
//! assert_eq!(classify_error(&err.to_string()), ErrorType::Timeout);
//! ```

use crate::logging::{log_error, log_warn};
use thiserror::Error;

// ============================================================================
// Error categorization types
// ============================================================================

/// High-level categorization of errors for routing and handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The provider or network had an issue.
    External,

    /// The caller or operator can fix this (credentials, configuration).
    Client,

    /// Rate limits and timeouts.
    Transient,
}

// ============================================================================
// LLM Error types
// ============================================================================

/// Convenient result type for provider operations.
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while invoking an LLM provider.
///
/// Use the constructor methods, which log the error at creation time with
/// structured fields:
///
/// ```rust
/// use aeo_tracker::LlmError;
///
/// let err = LlmError::empty_response("gemini");
/// assert_eq!(err.to_string(), "gemini returned an empty response");
/// ```
///
/// | Variant | Category | Retryable |
/// |---------|----------|-----------|
/// | `ConfigurationError` | Client | No |
/// | `ProviderUnavailable` | Client | No |
/// | `RequestFailed` | External | Yes |
/// | `ApiError` | External | Yes (5xx only) |
/// | `AuthenticationFailed` | Client | No |
/// | `RateLimitExceeded` | Transient | Yes |
/// | `Timeout` | Transient | Yes |
/// | `ResponseParsingError` | External | No |
/// | `EmptyResponse` | External | No |
/// | `AllProvidersFailed` | External | No |
#[derive(Error, Debug)]
pub enum LlmError {
    /// Adapter configuration is incomplete (missing endpoint, deployment, key).
    #[error("Provider configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// No usable credential exists for the provider family.
    #[error("{provider} provider not available: {reason}")]
    ProviderUnavailable {
        /// Provider family name.
        provider: String,
        /// Remediation hint, e.g. which variables to set.
        reason: String,
    },

    /// The HTTP request never produced a response (DNS, connect, TLS, body read).
    #[error("{provider} connection error: {message}")]
    RequestFailed {
        /// Provider family name.
        provider: String,
        /// Sanitized description of the failure.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} API error (http {status}): {message}")]
    ApiError {
        /// Provider family name.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Provider-supplied error message, redacted.
        message: String,
    },

    /// The provider rejected the credential (401/403).
    #[error("{provider} authentication failed (http {status}): {message}")]
    AuthenticationFailed {
        /// Provider family name.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Provider-supplied error message, redacted.
        message: String,
    },

    /// The provider is throttling requests (429).
    #[error(
        "{provider} rate limit exceeded (http 429){}, retry after {retry_after_seconds}s",
        message_suffix(.message)
    )]
    RateLimitExceeded {
        /// Provider family name.
        provider: String,
        /// Value of the `retry-after` header, or 60 when absent.
        retry_after_seconds: u64,
        /// Provider-supplied error message, redacted. Distinguishes quota
        /// exhaustion from transient throttling.
        message: Option<String>,
    },

    /// The per-call timeout elapsed.
    #[error("{provider} request timeout after {timeout_seconds}s")]
    Timeout {
        /// Provider family name.
        provider: String,
        /// The timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// The body could not be decoded into the expected JSON shape.
    #[error("{provider} response parsing failed: {message}")]
    ResponseParsingError {
        /// Provider family name.
        provider: String,
        /// Details about the parsing failure.
        message: String,
    },

    /// The call succeeded at the HTTP level but produced no usable text.
    #[error("{provider} returned an empty response")]
    EmptyResponse {
        /// Provider family name.
        provider: String,
    },

    /// Every candidate in a fallback chain failed or was skipped.
    #[error("No available provider succeeded (last attempted: {last_source}): {message}")]
    AllProvidersFailed {
        /// The last provider family that was tried or skipped.
        last_source: String,
        /// Display text of the last failure.
        message: String,
    },
}

/// `": <message>"` when a provider message is present, empty otherwise.
fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

impl LlmError {
    /// Get the error category for routing and handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigurationError { .. } => ErrorCategory::Client,
            Self::ProviderUnavailable { .. } => ErrorCategory::Client,
            Self::RequestFailed { .. } => ErrorCategory::External,
            Self::ApiError { .. } => ErrorCategory::External,
            Self::AuthenticationFailed { .. } => ErrorCategory::Client,
            Self::RateLimitExceeded { .. } => ErrorCategory::Transient,
            Self::Timeout { .. } => ErrorCategory::Transient,
            Self::ResponseParsingError { .. } => ErrorCategory::External,
            Self::EmptyResponse { .. } => ErrorCategory::External,
            Self::AllProvidersFailed { .. } => ErrorCategory::External,
        }
    }

    /// Whether a later attempt could plausibly succeed.
    ///
    /// The orchestrator never retries the same provider within one call; this
    /// is informational for callers scheduling a whole new tracking run.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. } | Self::Timeout { .. } | Self::RequestFailed { .. } => {
                true
            }
            Self::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider family the error belongs to, when there is one.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderUnavailable { provider, .. }
            | Self::RequestFailed { provider, .. }
            | Self::ApiError { provider, .. }
            | Self::AuthenticationFailed { provider, .. }
            | Self::RateLimitExceeded { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::ResponseParsingError { provider, .. }
            | Self::EmptyResponse { provider } => Some(provider),
            Self::AllProvidersFailed { last_source, .. } => Some(last_source),
            Self::ConfigurationError { .. } => None,
        }
    }

    // =========================================================================
    // Constructor methods with automatic logging
    // =========================================================================
    //
    // Messages passed in must already be redacted; none of these log prompt or
    // answer content.

    pub fn configuration_error(message: impl Into<String>) -> Self {
        let message = message.into();
        log_error!(
            error_type = "configuration_error",
            message = %message,
            "Provider configuration invalid"
        );
        Self::ConfigurationError { message }
    }

    pub fn provider_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        let provider = provider.into();
        let reason = reason.into();
        log_warn!(
            provider = %provider,
            error_type = "provider_unavailable",
            reason = %reason,
            "LLM provider not available"
        );
        Self::ProviderUnavailable { provider, reason }
    }

    pub fn request_failed(
        provider: impl Into<String>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let provider = provider.into();
        let message = message.into();
        log_error!(
            provider = %provider,
            error_type = "request_failed",
            message = %message,
            has_source = source.is_some(),
            "LLM request execution failed"
        );
        Self::RequestFailed {
            provider,
            message,
            source,
        }
    }

    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = message.into();
        log_error!(
            provider = %provider,
            error_type = "api_error",
            status = status,
            message = %message,
            "LLM provider returned an error status"
        );
        Self::ApiError {
            provider,
            status,
            message,
        }
    }

    pub fn authentication_failed(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        let provider = provider.into();
        let message = message.into();
        log_error!(
            provider = %provider,
            error_type = "authentication_failed",
            status = status,
            message = %message,
            "LLM provider authentication failed"
        );
        Self::AuthenticationFailed {
            provider,
            status,
            message,
        }
    }

    pub fn rate_limit_exceeded(
        provider: impl Into<String>,
        retry_after_seconds: u64,
        message: Option<String>,
    ) -> Self {
        let provider = provider.into();
        let message = message.filter(|m| !m.trim().is_empty());
        log_warn!(
            provider = %provider,
            error_type = "rate_limit_exceeded",
            retry_after_seconds = retry_after_seconds,
            has_message = message.is_some(),
            "LLM provider rate limit exceeded"
        );
        Self::RateLimitExceeded {
            provider,
            retry_after_seconds,
            message,
        }
    }

    pub fn timeout(provider: impl Into<String>, timeout_seconds: u64) -> Self {
        let provider = provider.into();
        log_warn!(
            provider = %provider,
            error_type = "timeout",
            timeout_seconds = timeout_seconds,
            "LLM request timed out"
        );
        Self::Timeout {
            provider,
            timeout_seconds,
        }
    }

    pub fn response_parsing_error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = message.into();
        log_warn!(
            provider = %provider,
            error_type = "response_parsing_error",
            message = %message,
            "LLM response format invalid"
        );
        Self::ResponseParsingError { provider, message }
    }

    pub fn empty_response(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        log_warn!(
            provider = %provider,
            error_type = "empty_response",
            "LLM returned blank output"
        );
        Self::EmptyResponse { provider }
    }

    pub fn all_providers_failed(last_source: impl Into<String>, last_error: &LlmError) -> Self {
        let last_source = last_source.into();
        let message = last_error.to_string();
        log_error!(
            error_type = "all_providers_failed",
            last_source = %last_source,
            message = %message,
            "Provider fallback chain exhausted"
        );
        Self::AllProvidersFailed {
            last_source,
            message,
        }
    }
}

// ============================================================================
// Search errors
// ============================================================================

/// Anti-automation interstitial detected on a scraped results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// CAPTCHA, `/sorry/` redirect or "unusual traffic" page.
    AutomationBlocked,
    /// Cookie/consent wall shown before results.
    ConsentInterstitial,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::AutomationBlocked => "google_automation_blocked",
            BlockReason::ConsentInterstitial => "google_consent_interstitial",
        }
    }
}

/// Errors raised by a search engine fetcher.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The search API answered with a non-success status.
    #[error("http_{status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Provider-supplied `error.message`, when the body carried one.
        message: Option<String>,
    },

    /// The request failed before a response arrived.
    #[error("{kind}")]
    Transport {
        /// Stable class name: `timeout`, `connectionerror`, `decodeerror`, `requesterror`.
        kind: &'static str,
    },

    /// The scraped page was an anti-automation interstitial.
    #[error("{}", .reason.as_str())]
    Blocked {
        /// Which interstitial was detected.
        reason: BlockReason,
    },

    /// The hard wall-clock limit for a scrape elapsed and the worker was aborted.
    #[error("google_search_timeout")]
    Timeout,

    /// The page renderer failed.
    #[error("render failed: {message}")]
    Render {
        /// Renderer error text.
        message: String,
    },
}

impl SearchError {
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            "timeout"
        } else if error.is_connect() {
            "connectionerror"
        } else if error.is_decode() || error.is_body() {
            "decodeerror"
        } else {
            "requesterror"
        };
        log_warn!(error_type = kind, "Search request transport failure");
        SearchError::Transport { kind }
    }

    /// Sanitized error string for the per-engine report entry.
    pub fn safe_message(&self) -> String {
        match self {
            SearchError::Http {
                status,
                message: Some(message),
            } if !message.trim().is_empty() => {
                format!("http_{status}: {}", crate::logging::redact_secrets(message.trim()))
            }
            SearchError::Http { status, .. } => format!("http_{status}"),
            SearchError::Transport { kind } => (*kind).to_string(),
            SearchError::Blocked { reason } => reason.as_str().to_string(),
            SearchError::Timeout => "google_search_timeout".to_string(),
            SearchError::Render { message } => {
                let lowered = message.trim().to_lowercase();
                if lowered.contains("sorry/index") || lowered.contains("unusual traffic") {
                    return BlockReason::AutomationBlocked.as_str().to_string();
                }
                if lowered.is_empty() {
                    return "rendererror".to_string();
                }
                crate::logging::redact_secrets(&lowered.chars().take(240).collect::<String>())
            }
        }
    }

    /// Blocks and scrape timeouts are reported as `unavailable`, not `error`.
    pub fn is_soft_unavailable(&self) -> bool {
        matches!(self, SearchError::Blocked { .. } | SearchError::Timeout)
            || self.safe_message() == BlockReason::AutomationBlocked.as_str()
    }
}

// ============================================================================
// Request construction errors
// ============================================================================

/// Result type for tracking entry points.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// The tracking request could not be built; nothing was attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("At least one prompt query is required")]
    NoQueries,

    #[error("Prompt tracking accepts up to {max} prompts per request ({requested} supplied)")]
    TooManyQueries { max: usize, requested: usize },

    #[error("No enabled LLM source selected. Available: {available}")]
    NoLlmSources { available: String },

    #[error("No LLM provider is configured: {reasons}")]
    NoProvidersAvailable { reasons: String },

    #[error("Target URL is required")]
    MissingTargetUrl,
}
