//! End-to-end report flows through the public core API
//!
//! Each test wires a `ReportEngine` to in-memory fakes and checks the shaped
//! output a dashboard would receive.

use std::sync::Arc;

use chrono::{Duration, Utc};
use pulse_core::testing::{FakeEngine, MemoryStore};
use pulse_core::types::{DateRange, Family, ReportRequest, SubTopic, Topic, TouchPoint};
use pulse_core::{PulseConfig, ReportEngine, ShapedMetric, WordCloud, WordCloudKey, WordCount};
use serde_json::json;

const PRIMARY: &str = "social_documents";

fn relief_store() -> MemoryStore {
    MemoryStore::default()
        .with_topic(Topic {
            id: 1,
            keywords: Some("flood,relief".to_string()),
            ..Default::default()
        })
        .with_sub_topic(SubTopic {
            id: 5,
            topic_id: 1,
            keywords: Some("shelter".to_string()),
            ..Default::default()
        })
        .with_touch_point(
            1,
            TouchPoint {
                id: 10,
                name: "Hotline".to_string(),
                keywords: Some("hotline".to_string()),
            },
        )
        .with_touch_point(
            1,
            TouchPoint {
                id: 11,
                name: "Field office".to_string(),
                keywords: Some("field office".to_string()),
            },
        )
}

fn reports(engine: FakeEngine, store: MemoryStore) -> ReportEngine {
    ReportEngine::new(Arc::new(engine), Arc::new(store), &PulseConfig::default())
}

fn request(metric: &str) -> ReportRequest {
    let mut request = ReportRequest::new(metric, 1);
    request.range = DateRange::new("2023-01-01", "2023-04-30");
    request
}

#[tokio::test]
async fn test_touchpoint_breakdown_ranks_points() {
    let engine = FakeEngine::default()
        .with_count_matching(PRIMARY, &["\"hotline\""], 3)
        .with_count_matching(PRIMARY, &["\"field office\""], 9);
    let shaped = reports(engine, relief_store())
        .run(Family::Social, &request("touchpointBreakdown"))
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&shaped).unwrap(),
        json!({ "series": "Field office,9|Hotline,3" })
    );
}

#[tokio::test]
async fn test_undp_aid_chart_from_terms_buckets() {
    let request = request("unAidsChart");
    let rendered = reports(FakeEngine::default(), relief_store())
        .prepare(&request)
        .await
        .unwrap()
        .rendered()
        .to_string();

    let engine = FakeEngine::default().with_search(
        PRIMARY,
        &rendered,
        json!({
            "hits": { "total": { "value": 13 }, "hits": [] },
            "aggregations": { "terms": { "buckets": [
                { "key": "Food", "doc_count": 4 },
                { "key": "Shelter", "doc_count": 9 }
            ] } }
        }),
    );
    let shaped = reports(engine, relief_store())
        .run(Family::Undp, &request)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&shaped).unwrap(),
        json!({ "series": "Shelter,9|Food,4" })
    );
}

#[tokio::test]
async fn test_sub_topic_word_cloud_served_from_cache() {
    let cached = WordCloud {
        sorted: vec![WordCount {
            text: "shelter".to_string(),
            value: 12,
        }],
        shuffled: vec![WordCount {
            text: "shelter".to_string(),
            value: 12,
        }],
    };
    let store = relief_store().with_word_cloud(
        WordCloudKey::SubTopic(5),
        &serde_json::to_string(&cached).unwrap(),
        Utc::now() - Duration::days(1),
    );

    let mut request = request("wordCloud");
    request.sub_topic_id = Some(5);

    // No canned search response: only the cache can satisfy this.
    let shaped = reports(FakeEngine::default(), store)
        .run(Family::Social, &request)
        .await
        .unwrap();

    match shaped {
        ShapedMetric::WordCloud(cloud) => assert_eq!(cloud, cached),
        other => panic!("expected word cloud, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sub_topic_narrows_every_count() {
    let engine = Arc::new(FakeEngine::default().with_count_matching(PRIMARY, &["flood"], 6));
    let reports = ReportEngine::new(engine.clone(), Arc::new(relief_store()), &PulseConfig::default());

    let mut request = request("totalMentions");
    request.sub_topic_id = Some(5);
    let shaped = reports.run(Family::Social, &request).await.unwrap();
    assert_eq!(serde_json::to_value(&shaped).unwrap(), json!({ "count": 6 }));

    let recorded = engine.recorded();
    assert_eq!(recorded.len(), 1);
    let query = pulse_core::testing::query_of(&recorded[0].1);
    assert!(query.contains("\"shelter\""));
    assert!(query.contains("\"flood\" OR \"relief\""));
}

#[tokio::test]
async fn test_sentiment_percentages_always_sum_to_hundred() {
    let engine = FakeEngine::default()
        .with_count_matching(PRIMARY, &["flood"], 3)
        .with_count_matching(PRIMARY, &["predicted_sentiment_value:(\"Positive\")"], 1)
        .with_count_matching(PRIMARY, &["predicted_sentiment_value:(\"Negative\")"], 1);
    let shaped = reports(engine, relief_store())
        .run(Family::Undp, &request("sentimentSummary"))
        .await
        .unwrap();

    match shaped {
        ShapedMetric::Percentages(triple) => {
            let total: f64 = [&triple.positive, &triple.negative, &triple.neutral]
                .iter()
                .map(|p| p.parse::<f64>().unwrap())
                .sum();
            assert!((total - 100.0).abs() < 1e-9);
            assert_eq!(triple.positive, "33.33");
            assert_eq!(triple.neutral, "33.34");
        }
        other => panic!("expected percentages, got {:?}", other),
    }
}
