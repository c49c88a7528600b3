//! OpenAI-compatible wire types
//!
//! Chat-completions shapes are shared by the Azure and Perplexity adapters;
//! the Responses API shapes are used by the OpenAI adapter, which also falls
//! back to chat `choices` when a compatible proxy answers in that format.

use serde::{Deserialize, Serialize};

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completions `response_format` for structured output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String, // "json_schema"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<ChatJsonSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatJsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// Chat-completions request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Azure routes by deployment and ignores this field, so it is optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ChatResponseFormat>,
}

/// Chat-completions response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatResponseMessage {
    /// `null` when the model produced only a refusal or tool call
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// First choice's content, or empty.
    pub fn first_content(&self) -> String {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}

// ============================================================================
// Responses API
// ============================================================================

/// `POST /v1/responses` body
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: String,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<ResponsesTextConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningConfig {
    pub effort: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponsesTextConfig {
    pub format: ResponsesTextFormat,
}

/// Responses API flattens the schema fields into `text.format`
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesTextFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub name: String,
    pub schema: serde_json::Value,
    pub strict: bool,
}

/// `POST /v1/responses` result; every field is optional so partial bodies still parse
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output_text: Option<String>,
    #[serde(default)]
    pub output: Vec<ResponsesOutputItem>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
    /// Legacy chat shape returned by some compatible gateways
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesOutputItem {
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub content: Vec<ResponsesContentPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesContentPart {
    #[serde(rename = "type", default)]
    pub part_type: Option<String>,
    #[serde(default)]
    pub text: Option<ResponsesText>,
}

/// Output text is either a bare string or `{"value": "..."}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponsesText {
    Plain(String),
    Wrapped { value: String },
}

impl ResponsesText {
    pub fn as_str(&self) -> &str {
        match self {
            ResponsesText::Plain(text) => text,
            ResponsesText::Wrapped { value } => value,
        }
    }
}

impl ResponsesResponse {
    /// Answer text, probing `output_text`, then `output[].content[]`, then
    /// `choices[0].message.content`. Empty when none carries text.
    pub fn extract_text(&self) -> String {
        if let Some(text) = self.output_text.as_deref().map(str::trim) {
            if !text.is_empty() {
                return text.to_string();
            }
        }

        let parts: Vec<&str> = self
            .output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| {
                matches!(
                    part.part_type.as_deref(),
                    None | Some("output_text") | Some("text")
                )
            })
            .filter_map(|part| part.text.as_ref().map(ResponsesText::as_str))
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect();
        if !parts.is_empty() {
            return parts.join("\n");
        }

        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }

    /// True when the provider stopped because the output budget ran out.
    pub fn truncated_by_budget(&self) -> bool {
        self.status.as_deref() == Some("incomplete")
            && self
                .incomplete_details
                .as_ref()
                .and_then(|details| details.reason.as_deref())
                == Some("max_output_tokens")
    }

    /// Output item types, for diagnosing empty answers without logging content.
    pub fn output_types(&self) -> Vec<String> {
        self.output
            .iter()
            .map(|item| item.item_type.clone().unwrap_or_else(|| "unknown".to_string()))
            .collect()
    }
}
