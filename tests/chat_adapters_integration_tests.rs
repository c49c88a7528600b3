//! Integration Tests for the Chat-Completions Adapters
//!
//! UNIT UNDER TEST: AzureOpenAIAdapter, PerplexityAdapter
//!
//! BUSINESS RESPONSIBILITY:
//!   - Azure: routes by deployment and api-version, authenticates with a
//!     bearer token when one is configured and the api-key header otherwise
//!   - Perplexity: sends the configured model with bearer authentication and
//!     exposes the completion id as a reference URL
//!   - Both: read the first choice and map HTTP failures onto provider errors
//!
//! TEST COVERAGE:
//!   - Azure URL, query string, body and auth header precedence
//!   - Perplexity body, reference URL and empty choices
//!   - Error mapping through the shared HTTP layer

mod common;

use aeo_tracker::config::AzureOpenAIConfig;
use aeo_tracker::providers::{AzureOpenAIAdapter, PerplexityAdapter};
use aeo_tracker::{InvokeOptions, LlmError, ProviderAdapter};
use common::{azure_config, chat_body, error_response, perplexity_config, TEST_TIMEOUT};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AZURE_PATH: &str = "/openai/deployments/prod-gpt4o/chat/completions";

#[tokio::test]
async fn test_azure_uses_api_key_header_and_api_version() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AZURE_PATH))
        .and(query_param("api-version", "2024-10-21"))
        .and(header("api-key", "azure-test-key"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "best trail running shoes"}],
            "temperature": 0.2,
            "max_tokens": 800
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("chatcmpl-1", "Acme Shoes")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let adapter = AzureOpenAIAdapter::new(
        reqwest::Client::new(),
        azure_config(&format!("{}/", server.uri())),
        TEST_TIMEOUT,
    )
    .unwrap();

    // Act
    let reply = adapter
        .invoke("best trail running shoes", &InvokeOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(reply.text, "Acme Shoes");
    assert_eq!(reply.reference_url, None);
    assert_eq!(adapter.model(), "prod-gpt4o");

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert!(body.get("model").is_none());
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_azure_access_token_takes_precedence() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AZURE_PATH))
        .and(header("authorization", "Bearer entra-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("chatcmpl-2", "ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = AzureOpenAIConfig {
        access_token: Some("entra-token".to_string()),
        ..azure_config(&server.uri())
    };
    let adapter = AzureOpenAIAdapter::new(reqwest::Client::new(), config, TEST_TIMEOUT).unwrap();

    // Act
    let reply = adapter
        .invoke("prompt", &InvokeOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(reply.text, "ok");
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("api-key").is_none());
}

#[test]
fn test_azure_requires_endpoint_deployment_and_credential() {
    // Arrange
    let no_deployment = AzureOpenAIConfig {
        deployment: None,
        ..azure_config("https://acme.openai.azure.com")
    };
    let no_credential = AzureOpenAIConfig {
        api_key: None,
        access_token: None,
        ..azure_config("https://acme.openai.azure.com")
    };

    // Act
    let missing_deployment =
        AzureOpenAIAdapter::new(reqwest::Client::new(), no_deployment, TEST_TIMEOUT);
    let missing_credential =
        AzureOpenAIAdapter::new(reqwest::Client::new(), no_credential, TEST_TIMEOUT);

    // Assert
    assert!(matches!(
        missing_deployment,
        Err(LlmError::ConfigurationError { .. })
    ));
    assert!(matches!(
        missing_credential,
        Err(LlmError::ConfigurationError { .. })
    ));
}

#[tokio::test]
async fn test_azure_forbidden_is_authentication_error() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(AZURE_PATH))
        .respond_with(error_response(403, "Principal does not have access"))
        .mount(&server)
        .await;

    let adapter = AzureOpenAIAdapter::new(
        reqwest::Client::new(),
        azure_config(&server.uri()),
        TEST_TIMEOUT,
    )
    .unwrap();

    // Act
    let error = adapter
        .invoke("prompt", &InvokeOptions::default())
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(
        error,
        LlmError::AuthenticationFailed { status: 403, .. }
    ));
    assert_eq!(error.provider(), Some("azure_openai"));
}

#[tokio::test]
async fn test_perplexity_sends_model_and_returns_reference() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer pplx-test"))
        .and(body_partial_json(json!({
            "model": "sonar",
            "messages": [{"role": "user", "content": "best trail running shoes"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("pplx-42", "Try acmeshoes.com for wide fits.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let adapter = PerplexityAdapter::new(
        reqwest::Client::new(),
        perplexity_config(&server.uri()),
        TEST_TIMEOUT,
    )
    .unwrap();

    // Act
    let reply = adapter
        .invoke("best trail running shoes", &InvokeOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(reply.text, "Try acmeshoes.com for wide fits.");
    assert_eq!(
        reply.reference_url,
        Some(format!("{}/chat/completions/pplx-42", server.uri()))
    );
    let body: Value = server.received_requests().await.unwrap()[0]
        .body_json()
        .unwrap();
    assert!(body.get("max_tokens").is_none());
}

#[tokio::test]
async fn test_perplexity_without_choices_is_blank_reply() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "pplx-43", "choices": []})),
        )
        .mount(&server)
        .await;

    let adapter = PerplexityAdapter::new(
        reqwest::Client::new(),
        perplexity_config(&server.uri()),
        TEST_TIMEOUT,
    )
    .unwrap();

    // Act
    let reply = adapter
        .invoke("prompt", &InvokeOptions::default())
        .await
        .unwrap();

    // Assert
    assert_eq!(reply.text, "");
    assert_eq!(reply.reference_url, None);
}

#[tokio::test]
async fn test_perplexity_rate_limit_defaults_retry_after() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(error_response(429, "Too many requests"))
        .mount(&server)
        .await;

    let adapter = PerplexityAdapter::new(
        reqwest::Client::new(),
        perplexity_config(&server.uri()),
        TEST_TIMEOUT,
    )
    .unwrap();

    // Act
    let error = adapter
        .invoke("prompt", &InvokeOptions::default())
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(
        error,
        LlmError::RateLimitExceeded {
            retry_after_seconds: 60,
            ..
        }
    ));
}
