//! Query template factory
//!
//! Pure functions wrapping a rendered query string and a time window into
//! one of the fixed request shapes the search engine expects. Every shape
//! shares the same `must` list, so a "how many" call and a "show me" call
//! for the same inputs filter identically.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::query::fields;
use crate::types::DateRange;

pub const AGG_TIMELINE: &str = "timeline";
pub const AGG_DIMENSION: &str = "dimension";
pub const AGG_POLARITY: &str = "polarity";
pub const AGG_TERMS: &str = "terms";

/// Histogram date format; series labels depend on it.
pub const HISTOGRAM_FORMAT: &str = "yyyy-MM-dd";

/// Query used when the expression is empty (no constraint).
const MATCH_EVERYTHING: &str = "*";

/// Numeric bounds of a `range` clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RangeBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
}

impl RangeBounds {
    pub fn gt(value: f64) -> Self {
        Self {
            gt: Some(value),
            ..Default::default()
        }
    }

    pub fn lt(value: f64) -> Self {
        Self {
            lt: Some(value),
            ..Default::default()
        }
    }

    /// `gte <= x < lt`; an open upper end when `lt` is `None`
    pub fn band(gte: f64, lt: Option<f64>) -> Self {
        Self {
            gte: Some(gte),
            lt,
            ..Default::default()
        }
    }

    pub fn to_clause(&self, field: &str) -> Value {
        json!({ "range": { field: self } })
    }
}

/// One named aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Terms {
        field: String,
        size: u64,
        sub: Option<(String, Box<Aggregation>)>,
    },
    Filters {
        filters: IndexMap<String, Value>,
    },
    DateHistogram {
        field: String,
        calendar_interval: String,
        format: String,
        extended_bounds: Option<(String, String)>,
        sub: Option<(String, Box<Aggregation>)>,
    },
}

impl Aggregation {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Terms { field, size, sub } => {
                let mut agg = json!({ "terms": { "field": field, "size": size } });
                if let Some((name, inner)) = sub {
                    agg["aggs"] = json!({ name.as_str(): inner.to_value() });
                }
                agg
            }
            Self::Filters { filters } => json!({ "filters": { "filters": filters } }),
            Self::DateHistogram {
                field,
                calendar_interval,
                format,
                extended_bounds,
                sub,
            } => {
                let mut histogram = json!({
                    "field": field,
                    "calendar_interval": calendar_interval,
                    "format": format,
                    "min_doc_count": 0,
                });
                if let Some((min, max)) = extended_bounds {
                    histogram["extended_bounds"] = json!({ "min": min, "max": max });
                }
                let mut agg = json!({ "date_histogram": histogram });
                if let Some((name, inner)) = sub {
                    agg["aggs"] = json!({ name.as_str(): inner.to_value() });
                }
                agg
            }
        }
    }
}

/// A request body under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    query: String,
    must: Vec<Value>,
    size: Option<u64>,
    sort: Option<Value>,
    aggs: IndexMap<String, Aggregation>,
}

impl SearchRequest {
    /// The rendered query string, kept for logging
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn must(&self) -> &[Value] {
        &self.must
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn sort(&self) -> Option<&Value> {
        self.sort.as_ref()
    }

    pub fn aggregations(&self) -> &IndexMap<String, Aggregation> {
        &self.aggs
    }

    #[must_use]
    pub fn with_aggregation(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        self.aggs.insert(name.into(), agg);
        self
    }

    /// Body for the engine's count endpoint, which accepts only a query.
    pub fn count_body(&self) -> Value {
        json!({ "query": { "bool": { "must": self.must } } })
    }

    /// Body for the engine's search endpoint.
    pub fn search_body(&self) -> Value {
        let mut body = self.count_body();
        if let Some(size) = self.size {
            body["size"] = json!(size);
        }
        if let Some(sort) = &self.sort {
            body["sort"] = sort.clone();
        }
        if !self.aggs.is_empty() {
            let aggs: serde_json::Map<String, Value> = self
                .aggs
                .iter()
                .map(|(name, agg)| (name.clone(), agg.to_value()))
                .collect();
            body["aggs"] = Value::Object(aggs);
        }
        body
    }
}

fn base_must(query: &str, range: &DateRange) -> Vec<Value> {
    let query = if query.trim().is_empty() {
        MATCH_EVERYTHING
    } else {
        query
    };
    // Either time field may be populated depending on the document source.
    vec![
        json!({ "query_string": { "query": query } }),
        json!({ "range": { fields::CREATED_TIME: { "gte": range.gte, "lte": range.lte } } }),
        json!({ "range": { fields::CREATED_AT: { "gte": range.gte, "lte": range.lte } } }),
    ]
}

/// Count-only request.
pub fn count_template(query: &str, range: &DateRange) -> SearchRequest {
    SearchRequest {
        query: query.to_string(),
        must: base_must(query, range),
        size: None,
        sort: None,
        aggs: IndexMap::new(),
    }
}

/// Bounded search returning the newest `size` hits.
pub fn search_template(query: &str, range: &DateRange, size: u64) -> SearchRequest {
    SearchRequest {
        size: Some(size),
        sort: Some(json!([{ fields::CREATED_TIME: { "order": "desc" } }])),
        ..count_template(query, range)
    }
}

/// Count request with one extra numeric range clause.
pub fn range_template(
    query: &str,
    range: &DateRange,
    field: &str,
    bounds: RangeBounds,
) -> SearchRequest {
    let mut request = count_template(query, range);
    request.must.push(bounds.to_clause(field));
    request
}

/// Histogram bucketing for timeline requests.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSpec {
    pub calendar_interval: String,
    pub extended_bounds: Option<(String, String)>,
}

/// Date histogram over `p_created_time` with one sub-aggregation per bucket.
pub fn date_histogram_template(
    query: &str,
    range: &DateRange,
    histogram: HistogramSpec,
    sub: Aggregation,
) -> SearchRequest {
    let agg = Aggregation::DateHistogram {
        field: fields::CREATED_TIME.to_string(),
        calendar_interval: histogram.calendar_interval,
        format: HISTOGRAM_FORMAT.to_string(),
        extended_bounds: histogram.extended_bounds,
        sub: Some((AGG_DIMENSION.to_string(), Box::new(sub))),
    };
    SearchRequest {
        size: Some(0),
        ..count_template(query, range)
    }
    .with_aggregation(AGG_TIMELINE, agg)
}

/// `size:0` request with one named `filters` aggregation.
pub fn filters_template(
    query: &str,
    range: &DateRange,
    name: &str,
    filters: IndexMap<String, Value>,
) -> SearchRequest {
    SearchRequest {
        size: Some(0),
        ..count_template(query, range)
    }
    .with_aggregation(name, Aggregation::Filters { filters })
}

/// `size:0` request with one named `terms` aggregation, optionally broken
/// out per bucket by `sub` (exposed under [`AGG_DIMENSION`]).
pub fn terms_template(
    query: &str,
    range: &DateRange,
    name: &str,
    field: &str,
    size: u64,
    sub: Option<Aggregation>,
) -> SearchRequest {
    SearchRequest {
        size: Some(0),
        ..count_template(query, range)
    }
    .with_aggregation(
        name,
        Aggregation::Terms {
            field: field.to_string(),
            size,
            sub: sub.map(|inner| (AGG_DIMENSION.to_string(), Box::new(inner))),
        },
    )
}

/// Signed polarity buckets; zero scores fall in neither.
pub fn polarity_filters() -> IndexMap<String, Value> {
    let mut filters = IndexMap::new();
    filters.insert(
        "positive".to_string(),
        RangeBounds::gt(0.0).to_clause(fields::POLARITY),
    );
    filters.insert(
        "negative".to_string(),
        RangeBounds::lt(0.0).to_clause(fields::POLARITY),
    );
    filters
}

/// One `match` filter per sentiment label, keyed by the lowercased label.
pub fn sentiment_filters(labels: &[&str]) -> IndexMap<String, Value> {
    labels
        .iter()
        .map(|label| {
            (
                label.to_lowercase(),
                json!({ "match": { fields::SENTIMENT: label } }),
            )
        })
        .collect()
}
