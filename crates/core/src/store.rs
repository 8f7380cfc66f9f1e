//! Relational lookup store interface
//!
//! The query layer reads topic configuration, keyword sets and cached word
//! clouds through this trait. `pulse-infra` provides the PostgreSQL
//! implementation; tests use the in-memory one from [`crate::testing`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::types::{SubTopic, Topic, TouchPoint};
use crate::Result;

/// Key of a cached word cloud row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordCloudKey {
    Topic(i64),
    SubTopic(i64),
}

impl WordCloudKey {
    /// Stable string form used as the cache row's unique key
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WordCloudKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic(id) => write!(f, "topic:{}", id),
            Self::SubTopic(id) => write!(f, "subtopic:{}", id),
        }
    }
}

/// A cached word cloud row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedWordCloud {
    /// Serialized word cloud payload
    pub payload: String,
    pub computed_at: DateTime<Utc>,
}

#[async_trait]
pub trait LookupStore: Send + Sync {
    async fn topic(&self, topic_id: i64) -> Result<Option<Topic>>;

    async fn sub_topic(&self, sub_topic_id: i64) -> Result<Option<SubTopic>>;

    async fn touch_point(&self, touchpoint_id: i64) -> Result<Option<TouchPoint>>;

    async fn touch_points_for_topic(&self, topic_id: i64) -> Result<Vec<TouchPoint>>;

    /// Review-index identifier of a customer account
    async fn customer_review_index(&self, account_id: i64) -> Result<Option<String>>;

    async fn omit_words(&self) -> Result<Vec<String>>;

    async fn word_cloud(&self, key: WordCloudKey) -> Result<Option<CachedWordCloud>>;

    /// Insert or replace the cached cloud for `key`. Last writer wins.
    async fn upsert_word_cloud(
        &self,
        key: WordCloudKey,
        payload: &str,
        computed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Most recent manual sentiment label for a document
    async fn sentiment_override(&self, document_id: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_cloud_keys() {
        assert_eq!(WordCloudKey::Topic(12).cache_key(), "topic:12");
        assert_eq!(WordCloudKey::SubTopic(3).cache_key(), "subtopic:3");
        assert_ne!(
            WordCloudKey::Topic(3).cache_key(),
            WordCloudKey::SubTopic(3).cache_key()
        );
    }
}
