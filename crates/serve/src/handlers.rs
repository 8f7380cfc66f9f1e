//! HTTP handlers for Pulse serve crate

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use pulse_core::types::Family;
use pulse_core::{ReportEngine, ShapedMetric};
use serde::{Deserialize, Serialize};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::error::ReportError;
use crate::payload::{parse_id, ReportPayload};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<ReportEngine>,
}

impl AppState {
    pub fn new(reports: ReportEngine) -> Self {
        Self {
            reports: Arc::new(reports),
        }
    }
}

/// Keyword lists configured for one topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicKeywordsResponse {
    pub topic_id: i64,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub urls: Vec<String>,
}

/// Handler for `POST /api/v1/:family/report`
pub async fn handle_report(
    State(state): State<AppState>,
    Path(family): Path<String>,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> Result<Json<ShapedMetric>, ReportError> {
    let family = Family::parse(&family)
        .ok_or_else(|| ReportError::bad_request(format!("Unknown report family '{}'", family)))?;
    let Json(payload) =
        payload.map_err(|e| ReportError::bad_request(format!("Invalid request body: {}", e)))?;
    let request = payload.into_request()?;

    let span = tracing::info_span!(
        "report",
        request_id = %Uuid::new_v4(),
        %family,
        metric = %request.metric,
        topic_id = request.topic_id,
    );

    async move {
        info!("Running report");
        let shaped = state.reports.run(family, &request).await?;
        Ok::<_, ReportError>(Json(shaped))
    }
    .instrument(span)
    .await
}

/// Handler for `GET /api/v1/topics/:id/keywords`
pub async fn handle_topic_keywords(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TopicKeywordsResponse>, ReportError> {
    let topic_id = parse_id(&serde_json::Value::String(id), "topic id")?;

    let topic = state
        .reports
        .store()
        .topic(topic_id)
        .await?
        .ok_or_else(|| ReportError::bad_request(format!("Topic {} not found", topic_id)))?;

    Ok(Json(TopicKeywordsResponse {
        topic_id,
        keywords: topic.keyword_terms(),
        hashtags: topic.hashtag_terms(),
        urls: topic.url_terms(),
    }))
}
