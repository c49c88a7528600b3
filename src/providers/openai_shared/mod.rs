//! Shared OpenAI-compatible API structures
//!
//! Request/response shapes used by the OpenAI Responses adapter and the two
//! chat-completions adapters (Azure OpenAI, Perplexity), plus the mapping from
//! a [`ResponseSchema`](crate::providers::ResponseSchema) onto each format.

pub mod types;

pub use types::*;

use crate::providers::ResponseSchema;

/// `response_format` for chat-completions endpoints
pub fn chat_response_format(schema: &ResponseSchema) -> ChatResponseFormat {
    ChatResponseFormat {
        format_type: "json_schema".to_string(),
        json_schema: Some(ChatJsonSchema {
            name: schema.name.clone(),
            schema: schema.schema.clone(),
            strict: Some(schema.strict),
        }),
    }
}

/// `text.format` for the Responses API
pub fn responses_text_config(schema: &ResponseSchema) -> ResponsesTextConfig {
    ResponsesTextConfig {
        format: ResponsesTextFormat {
            format_type: "json_schema".to_string(),
            name: schema.name.clone(),
            schema: schema.schema.clone(),
            strict: schema.strict,
        },
    }
}
