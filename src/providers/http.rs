//! Shared JSON-over-HTTP plumbing for provider adapters
//!
//! Every adapter posts one JSON body and receives one JSON body. This module
//! owns the parts they have in common: per-call timeouts, transport error
//! sanitization, and mapping non-2xx statuses onto [`LlmError`] variants with
//! the provider's own error message preserved.

use crate::error::{LlmError, LlmResult};
use crate::logging::{log_debug, log_error, redact_secrets};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on how much of an unstructured error body is kept
const MAX_ERROR_BODY_CHARS: usize = 300;

/// A failed POST: either the request never completed or the provider
/// answered with an error status.
#[derive(Debug)]
pub(crate) enum HttpFailure {
    Transport(LlmError),
    Status(ErrorResponse),
}

impl HttpFailure {
    pub(crate) fn into_llm_error(self, provider: &str) -> LlmError {
        match self {
            HttpFailure::Transport(error) => error,
            HttpFailure::Status(response) => response.into_llm_error(provider),
        }
    }
}

/// Non-success HTTP response, body already parsed as far as possible.
#[derive(Debug, Clone)]
pub(crate) struct ErrorResponse {
    pub status: u16,
    pub retry_after_seconds: Option<u64>,
    pub details: ErrorDetails,
}

impl ErrorResponse {
    /// True when the provider's `param`, `code` or `message` contains any needle.
    pub(crate) fn mentions_any(&self, needles: &[&str]) -> bool {
        let haystacks = [
            self.details.param.as_deref(),
            self.details.code.as_deref(),
            self.details.message.as_deref(),
        ];
        haystacks.into_iter().flatten().any(|text| {
            let lowered = text.to_lowercase();
            needles.iter().any(|needle| lowered.contains(needle))
        })
    }

    pub(crate) fn into_llm_error(self, provider: &str) -> LlmError {
        if self.status == 429 {
            return LlmError::rate_limit_exceeded(
                provider,
                self.retry_after_seconds.unwrap_or(60),
                self.details.message,
            );
        }

        let message = self
            .details
            .message
            .unwrap_or_else(|| "no error message supplied".to_string());

        match self.status {
            401 | 403 => LlmError::authentication_failed(provider, self.status, message),
            status => LlmError::api_error(provider, status, message),
        }
    }
}

/// Provider error fields that adapters care about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ErrorDetails {
    pub message: Option<String>,
    pub code: Option<String>,
    pub param: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorField>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detailed(ErrorObject),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: Option<String>,
    code: Option<serde_json::Value>,
    param: Option<String>,
    status: Option<String>,
}

/// Pull `error.message` / `error.code` / `error.param` out of an error body.
///
/// Handles the OpenAI, Azure, Perplexity and Google shapes; anything else
/// keeps a truncated copy of the raw body. Output is always redacted.
pub(crate) fn parse_error_details(body: &str) -> ErrorDetails {
    let details = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: Some(ErrorField::Detailed(object)),
            ..
        }) => ErrorDetails {
            message: object.message,
            code: object.code.map(|code| match code {
                serde_json::Value::String(text) => text,
                other => object.status.clone().unwrap_or_else(|| other.to_string()),
            }),
            param: object.param,
        },
        Ok(ErrorEnvelope {
            error: Some(ErrorField::Text(message)),
            ..
        }) => ErrorDetails {
            message: Some(message),
            ..ErrorDetails::default()
        },
        Ok(ErrorEnvelope {
            error: None,
            message: Some(message),
        }) => ErrorDetails {
            message: Some(message),
            ..ErrorDetails::default()
        },
        _ => {
            let trimmed = body.trim();
            ErrorDetails {
                message: (!trimmed.is_empty())
                    .then(|| trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()),
                ..ErrorDetails::default()
            }
        }
    };

    ErrorDetails {
        message: details
            .message
            .map(|message| redact_secrets(message.trim()))
            .filter(|message| !message.is_empty()),
        code: details.code,
        param: details.param,
    }
}

/// `Content-Type: application/json` plus a bearer token.
pub(crate) fn bearer_headers(provider: &str, token: &str) -> LlmResult<HeaderMap> {
    let mut headers = json_headers();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            LlmError::configuration_error(format!(
                "{provider} credential contains invalid header characters"
            ))
        })?,
    );
    Ok(headers)
}

pub(crate) fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// One JSON POST with a per-call timeout.
///
/// `query` parameters are attached separately so that credentials passed as
/// query values never appear in error text (`reqwest::Error::without_url`).
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    query: &[(&str, &str)],
    headers: HeaderMap,
    body: &B,
    timeout: Duration,
) -> Result<R, HttpFailure>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .query(query)
        .headers(headers)
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| HttpFailure::Transport(transport_error(provider, e, timeout)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HttpFailure::Status(read_error_response(provider, response).await));
    }

    let raw_body = response
        .text()
        .await
        .map_err(|e| HttpFailure::Transport(transport_error(provider, e, timeout)))?;

    log_debug!(
        provider = provider,
        status = status.as_u16(),
        body_bytes = raw_body.len(),
        "Provider response received"
    );

    serde_json::from_str(&raw_body).map_err(|e| {
        HttpFailure::Transport(LlmError::response_parsing_error(
            provider,
            format!("invalid JSON body: {e}"),
        ))
    })
}

async fn read_error_response(provider: &str, response: reqwest::Response) -> ErrorResponse {
    let status = response.status().as_u16();
    let retry_after_seconds = response
        .headers()
        .get("retry-after")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());
    let error_text = response.text().await.unwrap_or_default();
    let details = parse_error_details(&error_text);

    log_error!(
        provider = provider,
        status = status,
        error_code = ?details.code,
        error_param = ?details.param,
        "Provider returned error status"
    );

    ErrorResponse {
        status,
        retry_after_seconds,
        details,
    }
}

fn transport_error(provider: &str, error: reqwest::Error, timeout: Duration) -> LlmError {
    let error = error.without_url();
    if error.is_timeout() {
        return LlmError::timeout(provider, timeout.as_secs());
    }

    let message = if error.is_connect() {
        format!("connect failed: {error}")
    } else if error.is_body() || error.is_decode() {
        format!("reading body failed: {error}")
    } else {
        error.to_string()
    };

    LlmError::request_failed(provider, redact_secrets(&message), Some(Box::new(error)))
}
