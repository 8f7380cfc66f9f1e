//! Search engine interface and response model
//!
//! The engine is a black box supporting boolean full-text queries, range
//! filters, term aggregations and date histograms. `pulse-infra` speaks
//! to it over HTTP; [`crate::testing`] provides an in-memory fake.

use async_trait::async_trait;
use serde_json::Value;

use crate::template::AGG_DIMENSION;
use crate::Result;

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Number of documents in `index` matching `body`
    async fn count(&self, index: &str, body: &Value) -> Result<u64>;

    /// Hits and aggregations for `body`
    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse>;
}

/// One matched document.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub source: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    pub total: u64,
    pub aggregations: Value,
}

/// A `terms` bucket; `sub` is null unless the request asked for a breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct TermBucket {
    pub key: String,
    pub doc_count: u64,
    pub sub: Value,
}

/// A `date_histogram` bucket with its nested sub-aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBucket {
    pub key_as_string: String,
    pub doc_count: u64,
    pub sub: Value,
}

impl SearchResponse {
    /// Parse the engine's raw `_search` response.
    ///
    /// `hits.total` may be a bare number or `{"value": n}` depending on the
    /// engine version; both are accepted.
    pub fn from_raw(raw: &Value) -> Self {
        let hits = raw["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .map(|hit| Hit {
                        id: hit["_id"].as_str().unwrap_or_default().to_string(),
                        source: hit["_source"].clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let total = match &raw["hits"]["total"] {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            other => other["value"].as_u64().unwrap_or(0),
        };

        Self {
            hits,
            total,
            aggregations: raw.get("aggregations").cloned().unwrap_or(Value::Null),
        }
    }

    pub fn aggregation(&self, name: &str) -> &Value {
        &self.aggregations[name]
    }

    /// Named `filters` buckets of aggregation `name`, as counts.
    pub fn filters_counts(&self, name: &str) -> Vec<(String, u64)> {
        filters_counts(self.aggregation(name))
    }

    pub fn term_buckets(&self, name: &str) -> Vec<TermBucket> {
        term_buckets(self.aggregation(name))
    }

    pub fn histogram_buckets(&self, name: &str) -> Vec<HistogramBucket> {
        histogram_buckets(self.aggregation(name))
    }
}

pub fn filters_counts(agg: &Value) -> Vec<(String, u64)> {
    agg["buckets"]
        .as_object()
        .map(|buckets| {
            buckets
                .iter()
                .map(|(name, bucket)| (name.clone(), bucket["doc_count"].as_u64().unwrap_or(0)))
                .collect()
        })
        .unwrap_or_default()
}

pub fn term_buckets(agg: &Value) -> Vec<TermBucket> {
    agg["buckets"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .map(|bucket| TermBucket {
                    key: match &bucket["key"] {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                    doc_count: bucket["doc_count"].as_u64().unwrap_or(0),
                    sub: bucket[AGG_DIMENSION].clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn histogram_buckets(agg: &Value) -> Vec<HistogramBucket> {
    agg["buckets"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .map(|bucket| HistogramBucket {
                    key_as_string: bucket["key_as_string"]
                        .as_str()
                        .unwrap_or_default()
                        .to_string(),
                    doc_count: bucket["doc_count"].as_u64().unwrap_or(0),
                    sub: bucket[AGG_DIMENSION].clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}
