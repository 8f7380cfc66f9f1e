//! Report API integration tests
//!
//! Drives the full router in-process with in-memory engine and store fakes.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pulse_core::testing::{FakeEngine, MemoryStore};
use pulse_core::types::Topic;
use pulse_core::{PulseConfig, ReportEngine};
use pulse_serve::{create_app, AppState, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const PRIMARY: &str = "social_documents";

fn flood_topic() -> Topic {
    Topic {
        id: 1,
        keywords: Some("flood,relief".to_string()),
        hashtags: Some("#rains".to_string()),
        ..Default::default()
    }
}

fn app(engine: FakeEngine) -> Router {
    let store = MemoryStore::default().with_topic(flood_topic());
    let reports = ReportEngine::new(Arc::new(engine), Arc::new(store), &PulseConfig::default());
    create_app(&ServerConfig::default(), AppState::new(reports))
}

async fn post_report(app: Router, family: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/{}/report", family))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(FakeEngine::default()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_version_lists_families() {
    let (status, body) = get(app(FakeEngine::default()), "/version").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_version"], "v1");
    assert_eq!(body["families"], json!(["social", "undp"]));
}

#[tokio::test]
async fn test_total_mentions_with_string_topic_id() {
    let engine = FakeEngine::default().with_count_matching(PRIMARY, &["flood"], 12);
    let (status, body) = post_report(
        app(engine),
        "social",
        r#"{"type": "totalMentions", "topicId": "1", "gte": "2023-01-01", "lte": "2023-04-30"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "count": 12 }));
}

#[tokio::test]
async fn test_sentiment_summary_percentages() {
    let engine = FakeEngine::default()
        .with_count_matching(PRIMARY, &["flood"], 4)
        .with_count_matching(PRIMARY, &["predicted_sentiment_value:(\"Positive\")"], 2)
        .with_count_matching(PRIMARY, &["predicted_sentiment_value:(\"Negative\")"], 1);
    let (status, body) = post_report(
        app(engine),
        "social",
        r#"{"type": "sentimentSummary", "topicId": 1}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["positive"], "50.00");
    assert_eq!(body["negative"], "25.00");
    assert_eq!(body["neutral"], "25.00");
}

#[tokio::test]
async fn test_channel_sentiment_without_matches_is_empty_map() {
    let (status, body) = post_report(
        app(FakeEngine::default()),
        "social",
        r#"{"type": "channelSentiment", "topicId": 1, "filters": "{\"sources\": [\"All\"]}"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_missing_topic_id_is_bad_request() {
    let (status, body) = post_report(
        app(FakeEngine::default()),
        "social",
        r#"{"type": "totalMentions"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing topicId" }));
}

#[tokio::test]
async fn test_non_numeric_topic_id_is_bad_request() {
    let (status, body) = post_report(
        app(FakeEngine::default()),
        "social",
        r#"{"type": "totalMentions", "topicId": "flood"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid topicId");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, body) = post_report(app(FakeEngine::default()), "social", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_unknown_metric_and_family() {
    let (status, body) = post_report(
        app(FakeEngine::default()),
        "social",
        r#"{"type": "unAidsChart", "topicId": 1}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Unknown metric type 'unAidsChart' for social reports"
    );

    let (status, _) = post_report(
        app(FakeEngine::default()),
        "finance",
        r#"{"type": "totalMentions", "topicId": 1}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_engine_failure_is_opaque_500() {
    let engine = FakeEngine::default().failing_on("flood");
    let (status, body) = post_report(
        app(engine),
        "undp",
        r#"{"type": "totalMentions", "topicId": 1}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn test_topic_keywords() {
    let (status, body) = get(app(FakeEngine::default()), "/api/v1/topics/1/keywords").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "topicId": 1,
            "keywords": ["flood", "relief"],
            "hashtags": ["#rains"],
            "urls": []
        })
    );
}

#[tokio::test]
async fn test_topic_keywords_unknown_topic() {
    let (status, body) = get(app(FakeEngine::default()), "/api/v1/topics/99/keywords").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Topic 99 not found");

    let (status, _) = get(app(FakeEngine::default()), "/api/v1/topics/abc/keywords").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
