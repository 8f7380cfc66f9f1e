//! Word cloud ranking and cache
//!
//! Terms come from a `terms` aggregation over the message field of the
//! matched set. The ranked list is kept twice: `sorted` by frequency and a
//! `shuffled` display copy. Both are cached per topic or sub-topic.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::WordCloudConfig;
use crate::engine::TermBucket;
use crate::executor::AggregationExecutor;
use crate::query::fields;
use crate::store::{LookupStore, WordCloudKey};
use crate::template::{terms_template, AGG_TERMS};
use crate::types::DateRange;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub text: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCloud {
    /// Descending by frequency
    pub sorted: Vec<WordCount>,
    /// Display order
    pub shuffled: Vec<WordCount>,
}

impl WordCloud {
    /// Shuffle a copy of `sorted` for display.
    pub fn from_sorted<R: Rng + ?Sized>(sorted: Vec<WordCount>, rng: &mut R) -> Self {
        let mut shuffled = sorted.clone();
        fisher_yates(&mut shuffled, rng);
        Self { sorted, shuffled }
    }
}

/// In-place Fisher–Yates shuffle.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

fn is_numeric(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

/// Filter and rank candidate terms.
pub fn rank_terms(
    buckets: &[TermBucket],
    omit_words: &[String],
    min_token_length: usize,
    max_terms: usize,
) -> Vec<WordCount> {
    let mut ranked: Vec<WordCount> = buckets
        .iter()
        .filter(|bucket| !is_numeric(&bucket.key))
        .filter(|bucket| bucket.key.chars().count() >= min_token_length)
        .filter(|bucket| {
            !omit_words
                .iter()
                .any(|omit| omit.eq_ignore_ascii_case(&bucket.key))
        })
        .map(|bucket| WordCount {
            text: bucket.key.clone(),
            value: bucket.doc_count,
        })
        .collect();

    ranked.sort_by(|a, b| b.value.cmp(&a.value));
    ranked.truncate(max_terms);
    ranked
}

/// How a cloud request treats the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve a fresh cached row, else recompute and upsert
    Use,
    /// Recompute and upsert without reading
    Refresh,
    /// Recompute only; the result is narrower than the cache key
    Bypass,
}

/// Computes word clouds, consulting the store's cache first.
pub struct WordCloudService {
    executor: Arc<AggregationExecutor>,
    store: Arc<dyn LookupStore>,
    config: WordCloudConfig,
}

impl WordCloudService {
    pub fn new(
        executor: Arc<AggregationExecutor>,
        store: Arc<dyn LookupStore>,
        config: WordCloudConfig,
    ) -> Self {
        Self {
            executor,
            store,
            config,
        }
    }

    /// Cloud for `query`, cached under `key` as `policy` allows.
    pub async fn cloud(
        &self,
        key: WordCloudKey,
        query: &str,
        range: &DateRange,
        policy: CachePolicy,
    ) -> Result<WordCloud> {
        if policy == CachePolicy::Use {
            if let Some(cloud) = self.cached(key).await? {
                debug!(%key, "word cloud cache hit");
                return Ok(cloud);
            }
        }

        let cloud = self.compute(query, range).await?;
        if policy == CachePolicy::Bypass {
            debug!(%key, "word cloud not cached for narrowed scope");
            return Ok(cloud);
        }

        match serde_json::to_string(&cloud) {
            Ok(payload) => {
                if let Err(e) = self.store.upsert_word_cloud(key, &payload, Utc::now()).await {
                    warn!(%key, error = %e, "failed to cache word cloud");
                }
            }
            Err(e) => warn!(%key, error = %e, "failed to serialize word cloud"),
        }

        Ok(cloud)
    }

    async fn cached(&self, key: WordCloudKey) -> Result<Option<WordCloud>> {
        let Some(entry) = self.store.word_cloud(key).await? else {
            return Ok(None);
        };

        let cutoff = Duration::try_days(self.config.freshness_days)
            .and_then(|age| Utc::now().checked_sub_signed(age));
        if cutoff.is_some_and(|cutoff| entry.computed_at < cutoff) {
            debug!(%key, computed_at = %entry.computed_at, "word cloud cache stale");
            return Ok(None);
        }

        match serde_json::from_str(&entry.payload) {
            Ok(cloud) => Ok(Some(cloud)),
            Err(e) => {
                warn!(%key, error = %e, "malformed cached word cloud, recomputing");
                Ok(None)
            }
        }
    }

    async fn compute(&self, query: &str, range: &DateRange) -> Result<WordCloud> {
        let request = terms_template(
            query,
            range,
            AGG_TERMS,
            fields::MESSAGE,
            self.config.candidate_terms,
            None,
        );
        let response = self.executor.search(&request).await?;
        let omit_words = self.store.omit_words().await?;

        let sorted = rank_terms(
            &response.term_buckets(AGG_TERMS),
            &omit_words,
            self.config.min_token_length,
            self.config.max_terms,
        );
        Ok(WordCloud::from_sorted(sorted, &mut rand::rng()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchSettings;
    use crate::testing::{FakeEngine, MemoryStore};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};

    fn bucket(key: &str, doc_count: u64) -> TermBucket {
        TermBucket {
            key: key.to_string(),
            doc_count,
            sub: Value::Null,
        }
    }

    #[test]
    fn test_rank_terms_filters() {
        let buckets = vec![
            bucket("flood", 3),
            bucket("2023", 40),
            bucket("rain", 12),
            bucket("the", 50),
            bucket("Relief", 8),
            bucket("water", 20),
        ];
        let ranked = rank_terms(&buckets, &["relief".to_string()], 4, 2);
        let texts: Vec<&str> = ranked.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["water", "rain"]);
    }

    #[test]
    fn test_shuffle_keeps_sorted_copy() {
        let sorted: Vec<WordCount> = (0..20)
            .rev()
            .map(|n| WordCount {
                text: format!("term{}", n),
                value: n,
            })
            .collect();
        let cloud = WordCloud::from_sorted(sorted.clone(), &mut StdRng::seed_from_u64(7));
        assert_eq!(cloud.sorted, sorted);

        let mut reordered = cloud.shuffled.clone();
        reordered.sort_by(|a, b| b.value.cmp(&a.value));
        assert_eq!(reordered, sorted);
    }

    fn service(engine: FakeEngine, store: Arc<MemoryStore>) -> WordCloudService {
        let executor = AggregationExecutor::new(Arc::new(engine), &SearchSettings::default());
        WordCloudService::new(Arc::new(executor), store, WordCloudConfig::default())
    }

    fn terms_engine() -> FakeEngine {
        FakeEngine::default().with_search(
            "social_documents",
            "q",
            json!({ "aggregations": { "terms": { "buckets": [
                { "key": "water", "doc_count": 5 },
                { "key": "shelter", "doc_count": 2 }
            ] } } }),
        )
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_engine() {
        let cached = WordCloud {
            sorted: vec![WordCount {
                text: "cached".to_string(),
                value: 1,
            }],
            shuffled: vec![WordCount {
                text: "cached".to_string(),
                value: 1,
            }],
        };
        let store = Arc::new(MemoryStore::default().with_word_cloud(
            WordCloudKey::Topic(1),
            &serde_json::to_string(&cached).unwrap(),
            Utc::now() - Duration::days(2),
        ));
        // The engine has no canned response; a search would fail.
        let cloud = service(FakeEngine::default(), store)
            .cloud(WordCloudKey::Topic(1), "q", &DateRange::default(), CachePolicy::Use)
            .await
            .unwrap();
        assert_eq!(cloud, cached);
    }

    #[tokio::test]
    async fn test_stale_or_malformed_cache_recomputes() {
        let store = Arc::new(MemoryStore::default().with_word_cloud(
            WordCloudKey::Topic(1),
            "{}",
            Utc::now() - Duration::days(8),
        ));
        let stale = service(terms_engine(), store.clone());
        let cloud = stale
            .cloud(WordCloudKey::Topic(1), "q", &DateRange::default(), CachePolicy::Use)
            .await
            .unwrap();
        assert_eq!(cloud.sorted[0].text, "water");
        assert_eq!(store.word_cloud_rows(), 1);

        let store = Arc::new(MemoryStore::default().with_word_cloud(
            WordCloudKey::Topic(1),
            "not json",
            Utc::now(),
        ));
        let malformed = service(terms_engine(), store);
        let cloud = malformed
            .cloud(WordCloudKey::Topic(1), "q", &DateRange::default(), CachePolicy::Use)
            .await
            .unwrap();
        assert_eq!(cloud.sorted.len(), 2);
    }

    #[tokio::test]
    async fn test_store_omit_words_are_dropped() {
        let store = Arc::new(MemoryStore::default().with_omit_words(&["Shelter"]));
        let cloud = service(terms_engine(), store)
            .cloud(WordCloudKey::Topic(1), "q", &DateRange::default(), CachePolicy::Use)
            .await
            .unwrap();
        let texts: Vec<&str> = cloud.sorted.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["water"]);
        assert_eq!(cloud.shuffled.len(), 1);
    }

    #[tokio::test]
    async fn test_bypass_neither_reads_nor_writes_cache() {
        let cached = WordCloud {
            sorted: vec![WordCount {
                text: "topicwide".to_string(),
                value: 50,
            }],
            shuffled: vec![WordCount {
                text: "topicwide".to_string(),
                value: 50,
            }],
        };
        let payload = serde_json::to_string(&cached).unwrap();
        let store = Arc::new(MemoryStore::default().with_word_cloud(
            WordCloudKey::Topic(1),
            &payload,
            Utc::now(),
        ));
        let cloud = service(terms_engine(), store.clone())
            .cloud(WordCloudKey::Topic(1), "q", &DateRange::default(), CachePolicy::Bypass)
            .await
            .unwrap();
        assert_eq!(cloud.sorted[0].text, "water");

        let row = store.word_cloud(WordCloudKey::Topic(1)).await.unwrap().unwrap();
        assert_eq!(row.payload, payload);
    }

    #[tokio::test]
    async fn test_huge_freshness_never_expires() {
        let store = Arc::new(MemoryStore::default().with_word_cloud(
            WordCloudKey::Topic(1),
            "{\"sorted\":[],\"shuffled\":[]}",
            Utc::now() - Duration::days(400),
        ));
        let executor =
            AggregationExecutor::new(Arc::new(FakeEngine::default()), &SearchSettings::default());
        let config = WordCloudConfig {
            freshness_days: i64::MAX,
            ..Default::default()
        };
        let cloud = WordCloudService::new(Arc::new(executor), store, config)
            .cloud(WordCloudKey::Topic(1), "q", &DateRange::default(), CachePolicy::Use)
            .await
            .unwrap();
        assert!(cloud.sorted.is_empty());
    }

    #[tokio::test]
    async fn test_recompute_upserts_one_row_per_key() {
        let store = Arc::new(MemoryStore::default());
        let refreshing = service(terms_engine(), store.clone());
        for _ in 0..3 {
            refreshing
                .cloud(WordCloudKey::SubTopic(4), "q", &DateRange::default(), CachePolicy::Refresh)
                .await
                .unwrap();
        }
        assert_eq!(store.word_cloud_rows(), 1);
        let cached = store
            .word_cloud(WordCloudKey::SubTopic(4))
            .await
            .unwrap()
            .unwrap();
        let cloud: WordCloud = serde_json::from_str(&cached.payload).unwrap();
        assert_eq!(cloud.sorted[0].text, "water");
    }
}
