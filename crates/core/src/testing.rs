//! In-memory fakes of the search engine and lookup store
//!
//! Available to this crate's tests and, through the `testing` feature, to
//! downstream integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::engine::{SearchEngine, SearchResponse};
use crate::store::{CachedWordCloud, LookupStore, WordCloudKey};
use crate::types::{SubTopic, Topic, TouchPoint};
use crate::{PulseError, Result};

/// Lookup store backed by hash maps.
#[derive(Default)]
pub struct MemoryStore {
    topics: HashMap<i64, Topic>,
    sub_topics: HashMap<i64, SubTopic>,
    touch_points: HashMap<i64, (i64, TouchPoint)>,
    review_indices: HashMap<i64, String>,
    omit_words: Vec<String>,
    overrides: HashMap<String, String>,
    word_clouds: Mutex<HashMap<String, CachedWordCloud>>,
}

impl MemoryStore {
    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topics.insert(topic.id, topic);
        self
    }

    pub fn with_sub_topic(mut self, sub_topic: SubTopic) -> Self {
        self.sub_topics.insert(sub_topic.id, sub_topic);
        self
    }

    pub fn with_touch_point(mut self, topic_id: i64, touch_point: TouchPoint) -> Self {
        self.touch_points
            .insert(touch_point.id, (topic_id, touch_point));
        self
    }

    pub fn with_review_index(mut self, account_id: i64, index: &str) -> Self {
        self.review_indices.insert(account_id, index.to_string());
        self
    }

    pub fn with_omit_words(mut self, words: &[&str]) -> Self {
        self.omit_words = words.iter().map(|w| w.to_string()).collect();
        self
    }

    pub fn with_sentiment_override(mut self, document_id: &str, label: &str) -> Self {
        self.overrides
            .insert(document_id.to_string(), label.to_string());
        self
    }

    pub fn with_word_cloud(
        self,
        key: WordCloudKey,
        payload: &str,
        computed_at: DateTime<Utc>,
    ) -> Self {
        if let Ok(mut rows) = self.word_clouds.lock() {
            rows.insert(
                key.cache_key(),
                CachedWordCloud {
                    payload: payload.to_string(),
                    computed_at,
                },
            );
        }
        self
    }

    /// Number of cached word cloud rows
    pub fn word_cloud_rows(&self) -> usize {
        self.word_clouds.lock().map(|rows| rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LookupStore for MemoryStore {
    async fn topic(&self, topic_id: i64) -> Result<Option<Topic>> {
        Ok(self.topics.get(&topic_id).cloned())
    }

    async fn sub_topic(&self, sub_topic_id: i64) -> Result<Option<SubTopic>> {
        Ok(self.sub_topics.get(&sub_topic_id).cloned())
    }

    async fn touch_point(&self, touchpoint_id: i64) -> Result<Option<TouchPoint>> {
        Ok(self
            .touch_points
            .get(&touchpoint_id)
            .map(|(_, tp)| tp.clone()))
    }

    async fn touch_points_for_topic(&self, topic_id: i64) -> Result<Vec<TouchPoint>> {
        let mut points: Vec<TouchPoint> = self
            .touch_points
            .values()
            .filter(|(owner, _)| *owner == topic_id)
            .map(|(_, tp)| tp.clone())
            .collect();
        points.sort_by_key(|tp| tp.id);
        Ok(points)
    }

    async fn customer_review_index(&self, account_id: i64) -> Result<Option<String>> {
        Ok(self.review_indices.get(&account_id).cloned())
    }

    async fn omit_words(&self) -> Result<Vec<String>> {
        Ok(self.omit_words.clone())
    }

    async fn word_cloud(&self, key: WordCloudKey) -> Result<Option<CachedWordCloud>> {
        let rows = self
            .word_clouds
            .lock()
            .map_err(|e| PulseError::store(e.to_string()))?;
        Ok(rows.get(&key.cache_key()).cloned())
    }

    async fn upsert_word_cloud(
        &self,
        key: WordCloudKey,
        payload: &str,
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = self
            .word_clouds
            .lock()
            .map_err(|e| PulseError::store(e.to_string()))?;
        rows.insert(
            key.cache_key(),
            CachedWordCloud {
                payload: payload.to_string(),
                computed_at,
            },
        );
        Ok(())
    }

    async fn sentiment_override(&self, document_id: &str) -> Result<Option<String>> {
        Ok(self.overrides.get(document_id).cloned())
    }
}

struct CountRule {
    index: String,
    fragments: Vec<String>,
    exact: bool,
    count: u64,
}

impl CountRule {
    fn matches(&self, index: &str, query: &str) -> bool {
        self.index == index
            && if self.exact {
                self.fragments.first().map(String::as_str) == Some(query)
            } else {
                self.fragments.iter().all(|f| query.contains(f.as_str()))
            }
    }
}

/// Search engine fake with canned answers keyed by query string.
///
/// Unmatched counts return zero. Unmatched searches are answered from the
/// seeded documents (evaluating `filters` aggregations), or fail when no
/// documents were seeded.
#[derive(Default)]
pub struct FakeEngine {
    counts: Vec<CountRule>,
    searches: HashMap<(String, String), Value>,
    documents: Vec<Value>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    recorded: Mutex<Vec<(String, Value)>>,
}

/// The query string inside a request body built by the template factory
pub fn query_of(body: &Value) -> String {
    body["query"]["bool"]["must"][0]["query_string"]["query"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn satisfies(doc: &Value, filter: &Value) -> bool {
    if let Some(range) = filter["range"].as_object() {
        return range.iter().all(|(field, bounds)| {
            let Some(value) = doc[field].as_f64() else {
                return false;
            };
            let bound = |op: &str| bounds[op].as_f64();
            bound("gt").map_or(true, |b| value > b)
                && bound("gte").map_or(true, |b| value >= b)
                && bound("lt").map_or(true, |b| value < b)
                && bound("lte").map_or(true, |b| value <= b)
        });
    }
    if let Some(matcher) = filter["match"].as_object() {
        return matcher.iter().all(|(field, expected)| &doc[field] == expected);
    }
    true
}

impl FakeEngine {
    /// Exact-query count
    pub fn with_count(mut self, index: &str, query: &str, count: u64) -> Self {
        self.counts.insert(
            0,
            CountRule {
                index: index.to_string(),
                fragments: vec![query.to_string()],
                exact: true,
                count,
            },
        );
        self
    }

    /// Count for any query containing every fragment. Rules registered
    /// later take precedence.
    pub fn with_count_matching(mut self, index: &str, fragments: &[&str], count: u64) -> Self {
        self.counts.insert(
            0,
            CountRule {
                index: index.to_string(),
                fragments: fragments.iter().map(|f| f.to_string()).collect(),
                exact: false,
                count,
            },
        );
        self
    }

    /// Raw `_search` response for an exact query
    pub fn with_search(mut self, index: &str, query: &str, raw: Value) -> Self {
        self.searches
            .insert((index.to_string(), query.to_string()), raw);
        self
    }

    pub fn with_documents(mut self, documents: Vec<Value>) -> Self {
        self.documents = documents;
        self
    }

    /// Fail every request whose query contains `fragment`
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.failing.insert(fragment.to_string());
        self
    }

    /// Delay every request whose query contains `fragment`
    pub fn delaying(mut self, fragment: &str, delay: Duration) -> Self {
        self.delays.insert(fragment.to_string(), delay);
        self
    }

    /// Every `(index, body)` received so far
    pub fn recorded(&self) -> Vec<(String, Value)> {
        self.recorded
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    async fn intercept(&self, index: &str, body: &Value) -> Result<String> {
        if let Ok(mut recorded) = self.recorded.lock() {
            recorded.push((index.to_string(), body.clone()));
        }
        let query = query_of(body);
        if let Some(delay) = self
            .delays
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, delay)| *delay)
        {
            tokio::time::sleep(delay).await;
        }
        if self.failing.iter().any(|f| query.contains(f.as_str())) {
            return Err(PulseError::engine(format!("simulated failure for {}", query)));
        }
        Ok(query)
    }

    fn evaluate(&self, body: &Value) -> Value {
        let mut aggregations = serde_json::Map::new();
        if let Some(aggs) = body["aggs"].as_object() {
            for (name, agg) in aggs {
                if let Some(filters) = agg["filters"]["filters"].as_object() {
                    let buckets: serde_json::Map<String, Value> = filters
                        .iter()
                        .map(|(bucket, filter)| {
                            let count = self
                                .documents
                                .iter()
                                .filter(|doc| satisfies(doc, filter))
                                .count();
                            (bucket.clone(), json!({ "doc_count": count }))
                        })
                        .collect();
                    aggregations.insert(name.clone(), json!({ "buckets": buckets }));
                }
            }
        }
        let size = body["size"].as_u64().unwrap_or(10) as usize;
        let hits: Vec<Value> = self
            .documents
            .iter()
            .take(size)
            .enumerate()
            .map(|(i, doc)| json!({ "_id": format!("doc-{}", i + 1), "_source": doc }))
            .collect();
        json!({
            "hits": { "total": { "value": self.documents.len() }, "hits": hits },
            "aggregations": aggregations,
        })
    }
}

#[async_trait]
impl SearchEngine for FakeEngine {
    async fn count(&self, index: &str, body: &Value) -> Result<u64> {
        let query = self.intercept(index, body).await?;
        Ok(self
            .counts
            .iter()
            .find(|rule| rule.matches(index, &query))
            .map(|rule| rule.count)
            .unwrap_or(0))
    }

    async fn search(&self, index: &str, body: &Value) -> Result<SearchResponse> {
        let query = self.intercept(index, body).await?;
        if let Some(raw) = self.searches.get(&(index.to_string(), query.clone())) {
            return Ok(SearchResponse::from_raw(raw));
        }
        if self.documents.is_empty() {
            return Err(PulseError::engine(format!("no canned response for {}", query)));
        }
        Ok(SearchResponse::from_raw(&self.evaluate(body)))
    }
}
