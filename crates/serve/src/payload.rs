//! Report request payload validation
//!
//! Callers send loosely typed bodies: ids arrive as numbers or numeric
//! strings, and `filters` arrives either as an object or as a JSON-encoded
//! string. Everything is checked here so the core only ever sees a
//! [`ReportRequest`].

use pulse_core::types::{DateRange, FilterOverride, Interval, ReportRequest, SourceTab};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ReportError;

/// Raw body of `POST /api/v1/{family}/report`
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    /// Metric name from the family's registry
    #[serde(rename = "type")]
    pub metric: Option<String>,
    pub topic_id: Option<Value>,
    pub sub_topic_id: Option<Value>,
    pub touchpoint_id: Option<Value>,
    pub account_id: Option<Value>,
    pub filters: Option<Value>,
    pub scad: Option<Value>,
    pub tab: Option<String>,
    pub interval: Option<String>,
    pub gte: Option<String>,
    pub lte: Option<String>,
}

impl ReportPayload {
    /// Validate the payload into a core request
    pub fn into_request(self) -> Result<ReportRequest, ReportError> {
        let metric = self
            .metric
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ReportError::bad_request("Missing report type"))?;

        let topic_id = match self.topic_id.as_ref() {
            None | Some(Value::Null) => return Err(ReportError::bad_request("Missing topicId")),
            Some(value) => parse_id(value, "topicId")?,
        };

        let mut request = ReportRequest::new(metric, topic_id);
        request.sub_topic_id = optional_id(self.sub_topic_id.as_ref(), "subTopicId")?;
        request.touchpoint_id = optional_id(self.touchpoint_id.as_ref(), "touchpointId")?;
        request.account_id = optional_id(self.account_id.as_ref(), "accountId")?;
        request.filters = parse_filters(self.filters)?;
        request.scad = parse_flag(self.scad.as_ref(), "scad")?;
        request.tab = self
            .tab
            .as_deref()
            .map(SourceTab::from)
            .unwrap_or_default();

        if let Some(interval) = self.interval.as_deref() {
            request.interval = parse_interval(interval)?;
        }

        if self.gte.is_some() || self.lte.is_some() {
            let default = DateRange::default();
            request.range = DateRange::new(
                self.gte.unwrap_or(default.gte),
                self.lte.unwrap_or(default.lte),
            );
            request
                .range
                .validate()
                .map_err(|e| ReportError::bad_request(e.to_string()))?;
        }

        Ok(request)
    }
}

/// Parse an id sent as a JSON number or a numeric string
pub fn parse_id(value: &Value, field: &str) -> Result<i64, ReportError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.ok_or_else(|| ReportError::bad_request(format!("Invalid {}", field)))
}

fn optional_id(value: Option<&Value>, field: &str) -> Result<Option<i64>, ReportError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => parse_id(value, field).map(Some),
    }
}

fn parse_filters(value: Option<Value>) -> Result<Option<FilterOverride>, ReportError> {
    let filters = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => serde_json::from_str::<FilterOverride>(&s),
        Some(value @ Value::Object(_)) => serde_json::from_value::<FilterOverride>(value),
        Some(_) => return Err(ReportError::bad_request("Invalid filters payload")),
    }
    .map_err(|e| ReportError::bad_request(format!("Invalid filters payload: {}", e)))?;

    filters
        .validate()
        .map_err(|e| ReportError::bad_request(e.to_string()))?;
    Ok(Some(filters))
}

fn parse_flag(value: Option<&Value>, field: &str) -> Result<bool, ReportError> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(ReportError::bad_request(format!("Invalid {}", field))),
        },
        Some(_) => Err(ReportError::bad_request(format!("Invalid {}", field))),
    }
}

fn parse_interval(value: &str) -> Result<Interval, ReportError> {
    match value.trim().to_lowercase().as_str() {
        "day" | "daily" => Ok(Interval::Day),
        "week" | "weekly" => Ok(Interval::Week),
        "month" | "monthly" => Ok(Interval::Month),
        other => Err(ReportError::bad_request(format!(
            "Invalid interval '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::types::BoolOp;
    use serde_json::json;

    fn payload(body: Value) -> ReportPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_topic_id_as_string() {
        let request = payload(json!({ "type": "totalMentions", "topicId": "42" }))
            .into_request()
            .unwrap();
        assert_eq!(request.metric, "totalMentions");
        assert_eq!(request.topic_id, 42);
        assert_eq!(request.range, DateRange::default());
        assert!(!request.scad);
    }

    #[test]
    fn test_missing_or_invalid_topic_id() {
        let missing = payload(json!({ "type": "totalMentions" })).into_request();
        assert_eq!(missing.unwrap_err().to_string(), "Missing topicId");

        let invalid = payload(json!({ "type": "totalMentions", "topicId": "abc" })).into_request();
        assert_eq!(invalid.unwrap_err().to_string(), "Invalid topicId");

        let fractional = payload(json!({ "type": "totalMentions", "topicId": 1.5 })).into_request();
        assert!(fractional.is_err());
    }

    #[test]
    fn test_missing_type() {
        let result = payload(json!({ "topicId": 1 })).into_request();
        assert_eq!(result.unwrap_err().to_string(), "Missing report type");
    }

    #[test]
    fn test_filters_as_encoded_string() {
        let request = payload(json!({
            "type": "sentimentSummary",
            "topicId": 1,
            "filters": r#"{"includeTags":["storm"],"operator":"AND","sources":["Twitter"]}"#
        }))
        .into_request()
        .unwrap();

        let filters = request.filters.unwrap();
        assert_eq!(filters.include_tags, vec!["storm".to_string()]);
        assert_eq!(filters.operator, BoolOp::And);
        assert_eq!(filters.sources, vec!["Twitter".to_string()]);
    }

    #[test]
    fn test_filters_as_object_with_range() {
        let request = payload(json!({
            "type": "sentimentSummary",
            "topicId": 1,
            "filters": { "dateRange": { "gte": "2023-02-01", "lte": "2023-02-28" } }
        }))
        .into_request()
        .unwrap();

        assert_eq!(
            request.effective_range(),
            DateRange::new("2023-02-01", "2023-02-28")
        );
    }

    #[test]
    fn test_malformed_filters_rejected() {
        let result = payload(json!({
            "type": "sentimentSummary",
            "topicId": 1,
            "filters": "{not json"
        }))
        .into_request();
        assert!(result
            .unwrap_err()
            .to_string()
            .starts_with("Invalid filters payload"));

        let result = payload(json!({ "type": "posts", "topicId": 1, "filters": [1, 2] }))
            .into_request();
        assert!(result.is_err());
    }

    #[test]
    fn test_scoping_ids_and_mode() {
        let request = payload(json!({
            "type": "reviewSources",
            "topicId": 7,
            "subTopicId": "",
            "touchpointId": 3,
            "accountId": "12",
            "scad": "true",
            "tab": "GOOGLE",
            "interval": "week",
            "gte": "2023-01-01"
        }))
        .into_request()
        .unwrap();

        assert_eq!(request.sub_topic_id, None);
        assert_eq!(request.touchpoint_id, Some(3));
        assert_eq!(request.account_id, Some(12));
        assert!(request.scad);
        assert_eq!(request.tab, SourceTab::Google);
        assert_eq!(request.interval, Interval::Week);
        assert_eq!(request.range, DateRange::new("2023-01-01", "now"));
    }

    #[test]
    fn test_invalid_interval() {
        let result = payload(json!({ "type": "sentimentTimeline", "topicId": 1, "interval": "hourly" }))
            .into_request();
        assert_eq!(result.unwrap_err().to_string(), "Invalid interval 'hourly'");
    }
}
