//! End-to-End Tests for Prompt Tracking
//!
//! UNIT UNDER TEST: PromptTracker wired to HttpAdapterFactory and
//!                  SearchRankProber, every upstream served by wiremock
//!
//! BUSINESS RESPONSIBILITY:
//!   - Asks each requested LLM source the tracked query, with provider fallback
//!   - Scores every answer for the target brand and aggregates share of model
//!   - Ranks the target in the requested search engines
//!   - Produces one self-contained report per query
//!
//! TEST COVERAGE:
//!   - Successful run across OpenAI, Gemini and Naver
//!   - Source answered by its fallback provider
//!   - Every provider failing still yields a complete report
//!   - Multiple queries in request order
//!   - Report JSON shape

mod common;

use aeo_tracker::{
    ConfigSource, HttpAdapterFactory, LlmRouter, MentionTier, PromptTracker, ProviderFamily,
    SearchRankProber, SearchStatus, TrackerConfig, TrackingRequest,
};
use common::{error_response, gemini_body, responses_body, tracker_config, NAVER_PATH};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGET_URL: &str = "https://www.acmeshoes.com";
const QUERY: &str = "best trail running shoes";
const COMPETITIVE_ANSWER: &str =
    "Acme Shoes is a top pick, unlike Nike or Adidas. Compared with them, acmeshoes.com offers wider sizes.";
const UNRELATED_ANSWER: &str = "Popular picks include Nike and Brooks.";

fn tracker(config: TrackerConfig) -> PromptTracker {
    let config: Arc<dyn ConfigSource> = Arc::new(config);
    let client = reqwest::Client::new();
    let router = LlmRouter::new(
        Arc::clone(&config),
        Arc::new(HttpAdapterFactory::with_client(client.clone())),
    );
    let prober = SearchRankProber::new(Arc::clone(&config), client);
    PromptTracker::new(config, router, prober)
}

async fn mount_openai(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_gemini(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/.+:generateContent$"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_naver(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(NAVER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"title": "Shoe guide", "link": "https://guide.example.com/", "description": ""},
                {"title": "<b>Acme</b> Shoes", "link": "https://www.acmeshoes.com/", "description": "Official"}
            ]
        })))
        .mount(server)
        .await;
}

fn request(search_engines: &[&str]) -> TrackingRequest {
    TrackingRequest {
        search_engines: search_engines.iter().map(|e| e.to_string()).collect(),
        ..TrackingRequest::new(QUERY, TARGET_URL)
    }
}

#[tokio::test]
async fn test_full_run_scores_sources_and_ranks_target() {
    // Arrange
    let server = MockServer::start().await;
    mount_openai(
        &server,
        ResponseTemplate::new(200).set_body_json(responses_body("resp_e2e", COMPETITIVE_ANSWER)),
    )
    .await;
    mount_gemini(
        &server,
        ResponseTemplate::new(200).set_body_json(gemini_body(&[UNRELATED_ANSWER])),
    )
    .await;
    mount_naver(&server).await;

    let tracker = tracker(tracker_config(&server.uri()));

    // Act
    let reports = tracker.track(&request(&["naver"])).await.unwrap();

    // Assert
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.query, QUERY);
    assert_eq!(report.brand, "acmeshoes");
    assert_eq!(report.llm_results.len(), 2);

    let gpt = &report.llm_results[0];
    assert_eq!(gpt.source, "gpt");
    assert_eq!(gpt.provider_used, Some(ProviderFamily::Gpt));
    assert_eq!(gpt.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(gpt.tier, MentionTier::CompetitiveMention);
    assert_eq!(gpt.score, 70);
    assert_eq!(
        gpt.response_share_url,
        Some(format!("{}/v1/responses/resp_e2e", server.uri()))
    );

    let gemini = &report.llm_results[1];
    assert_eq!(gemini.source, "gemini");
    assert_eq!(gemini.provider_used, Some(ProviderFamily::Gemini));
    assert_eq!(gemini.tier, MentionTier::NotMentioned);
    assert_eq!(gemini.score, 0);

    assert_eq!(report.share_of_model_score, 35);
    assert_eq!(report.tracking_meta.ops.success_count, 2);
    assert_eq!(report.tracking_meta.ops.failure_count, 0);

    let naver = report.search_rank_results.get("naver").unwrap();
    assert_eq!(naver.status, SearchStatus::Ok);
    assert_eq!(naver.rank, Some(2));
    assert_eq!(naver.results[1].title, "Acme Shoes");
}

#[tokio::test]
async fn test_gpt_source_falls_back_to_gemini() {
    // Arrange
    let server = MockServer::start().await;
    mount_openai(&server, error_response(500, "The server had an error")).await;
    mount_gemini(
        &server,
        ResponseTemplate::new(200).set_body_json(gemini_body(&[COMPETITIVE_ANSWER])),
    )
    .await;

    let tracker = tracker(tracker_config(&server.uri()));

    // Act
    let reports = tracker.track(&request(&[])).await.unwrap();

    // Assert
    let report = &reports[0];
    let gpt = &report.llm_results[0];
    assert_eq!(gpt.source, "gpt");
    assert_eq!(gpt.provider_used, Some(ProviderFamily::Gemini));
    assert_eq!(gpt.model.as_deref(), Some("gemini-2.5-flash"));
    assert_eq!(gpt.score, 70);
    assert_eq!(report.share_of_model_score, 70);
    assert!(report.search_rank_results.is_empty());
}

#[tokio::test]
async fn test_all_providers_failing_still_reports() {
    // Arrange
    let server = MockServer::start().await;
    mount_openai(&server, error_response(401, "Incorrect API key provided")).await;
    mount_gemini(&server, error_response(500, "Internal error")).await;
    mount_naver(&server).await;

    let tracker = tracker(tracker_config(&server.uri()));

    // Act
    let reports = tracker.track(&request(&["naver"])).await.unwrap();

    // Assert
    let report = &reports[0];
    assert_eq!(report.llm_results.len(), 2);
    for record in &report.llm_results {
        assert_eq!(record.tier, MentionTier::NotAvailable);
        assert_eq!(record.score, 0);
        assert_eq!(record.provider_used, None);
        assert!(record.error_type.is_some());
        assert!(record.reason.contains("No available provider succeeded"));
    }
    assert_eq!(report.share_of_model_score, 0);
    assert_eq!(report.tracking_meta.ops.failure_count, 2);
    assert_eq!(
        report.search_rank_results.get("naver").unwrap().status,
        SearchStatus::Ok
    );
}

#[tokio::test]
async fn test_queries_are_reported_in_request_order() {
    // Arrange
    let server = MockServer::start().await;
    mount_openai(
        &server,
        ResponseTemplate::new(200).set_body_json(responses_body("resp_q", COMPETITIVE_ANSWER)),
    )
    .await;
    mount_gemini(
        &server,
        ResponseTemplate::new(200).set_body_json(gemini_body(&[COMPETITIVE_ANSWER])),
    )
    .await;

    let tracker = tracker(tracker_config(&server.uri()));
    let request = TrackingRequest {
        queries: vec![
            "trail shoes for wide feet".to_string(),
            "  ".to_string(),
            "waterproof hiking shoes".to_string(),
        ],
        llm_sources: vec!["GPT".to_string()],
        ..TrackingRequest::new(QUERY, TARGET_URL)
    };

    // Act
    let reports = tracker.track(&request).await.unwrap();

    // Assert
    let queries: Vec<&str> = reports.iter().map(|r| r.query.as_str()).collect();
    assert_eq!(
        queries,
        vec![QUERY, "trail shoes for wide feet", "waterproof hiking shoes"]
    );
    for report in &reports {
        assert_eq!(report.llm_results.len(), 1);
        assert_eq!(report.llm_results[0].source, "gpt");
    }
    assert_ne!(
        reports[0].tracking_meta.run_id,
        reports[1].tracking_meta.run_id
    );
}

#[tokio::test]
async fn test_report_json_shape() {
    // Arrange
    let server = MockServer::start().await;
    mount_openai(
        &server,
        ResponseTemplate::new(200).set_body_json(responses_body("resp_j", COMPETITIVE_ANSWER)),
    )
    .await;
    mount_gemini(
        &server,
        ResponseTemplate::new(200).set_body_json(gemini_body(&[COMPETITIVE_ANSWER])),
    )
    .await;
    mount_naver(&server).await;

    let tracker = tracker(tracker_config(&server.uri()));

    // Act
    let reports = tracker.track(&request(&["naver", "bing"])).await.unwrap();
    let json = serde_json::to_value(&reports[0]).unwrap();

    // Assert
    assert_eq!(json["share_of_model_score"], 70);
    assert_eq!(json["llm_results"][0]["tier"], "competitive_mention");
    assert_eq!(json["llm_results"][0]["provider_used"], "gpt");
    assert_eq!(json["search_rank_results"]["naver"]["rank"], 2);
    assert!(json["search_rank_results"]["bing"].is_object());
    assert_eq!(
        json["tracking_meta"]["storage_policy"],
        "no_raw_prompt_or_llm_response"
    );
    assert_eq!(
        json["tracking_meta"]["quality"]["tier_score_weights"]["core_mention"],
        100
    );
}
