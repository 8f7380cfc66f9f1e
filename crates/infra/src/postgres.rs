//! PostgreSQL lookup store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use pulse_core::config::DatabaseSettings;
use pulse_core::store::{CachedWordCloud, LookupStore, WordCloudKey};
use pulse_core::types::{SubTopic, Topic, TouchPoint};
use pulse_core::{PulseError, Result};

fn store_error(context: &str, e: sqlx::Error) -> PulseError {
    PulseError::store(format!("{}: {}", context, e))
}

#[derive(Debug, sqlx::FromRow)]
struct TopicRow {
    id: i64,
    keywords: Option<String>,
    hashtags: Option<String>,
    urls: Option<String>,
    exclude_words: Option<String>,
    exclude_accounts: Option<String>,
    data_sources: Option<String>,
    data_locations: Option<String>,
    data_languages: Option<String>,
    map_location_url: Option<String>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            keywords: row.keywords,
            hashtags: row.hashtags,
            urls: row.urls,
            exclude_words: row.exclude_words,
            exclude_accounts: row.exclude_accounts,
            data_sources: row.data_sources,
            data_locations: row.data_locations,
            data_languages: row.data_languages,
            map_location_url: row.map_location_url,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubTopicRow {
    id: i64,
    topic_id: i64,
    keywords: Option<String>,
    exclude_keywords: Option<String>,
    exclude_accounts: Option<String>,
    sources: Option<String>,
    monitoring_type: Option<String>,
}

impl From<SubTopicRow> for SubTopic {
    fn from(row: SubTopicRow) -> Self {
        Self {
            id: row.id,
            topic_id: row.topic_id,
            keywords: row.keywords,
            exclude_keywords: row.exclude_keywords,
            exclude_accounts: row.exclude_accounts,
            sources: row.sources,
            monitoring_type: row.monitoring_type,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TouchPointRow {
    id: i64,
    name: String,
    keywords: Option<String>,
}

impl From<TouchPointRow> for TouchPoint {
    fn from(row: TouchPointRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            keywords: row.keywords,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WordCloudRow {
    payload: String,
    computed_at: DateTime<Utc>,
}

/// Lookup store over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgLookupStore {
    pool: PgPool,
}

impl PgLookupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured URL and pool size
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.url)
            .await
            .map_err(|e| store_error("Failed to connect to database", e))?;
        tracing::info!("Database connected");
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PulseError::store(format!("Failed to run migrations: {}", e)))
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LookupStore for PgLookupStore {
    async fn topic(&self, topic_id: i64) -> Result<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>(
            "SELECT id, keywords, hashtags, urls, exclude_words, exclude_accounts,
                    data_sources, data_locations, data_languages, map_location_url
             FROM topics WHERE id = $1",
        )
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load topic", e))?;

        Ok(row.map(Topic::from))
    }

    async fn sub_topic(&self, sub_topic_id: i64) -> Result<Option<SubTopic>> {
        let row = sqlx::query_as::<_, SubTopicRow>(
            "SELECT id, topic_id, keywords, exclude_keywords, exclude_accounts, sources,
                    monitoring_type
             FROM sub_topics WHERE id = $1",
        )
        .bind(sub_topic_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load sub-topic", e))?;

        Ok(row.map(SubTopic::from))
    }

    async fn touch_point(&self, touchpoint_id: i64) -> Result<Option<TouchPoint>> {
        let row = sqlx::query_as::<_, TouchPointRow>(
            "SELECT id, name, keywords FROM touch_points WHERE id = $1",
        )
        .bind(touchpoint_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load touch point", e))?;

        Ok(row.map(TouchPoint::from))
    }

    async fn touch_points_for_topic(&self, topic_id: i64) -> Result<Vec<TouchPoint>> {
        let rows = sqlx::query_as::<_, TouchPointRow>(
            "SELECT id, name, keywords FROM touch_points WHERE topic_id = $1 ORDER BY id",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to list touch points", e))?;

        Ok(rows.into_iter().map(TouchPoint::from).collect())
    }

    async fn customer_review_index(&self, account_id: i64) -> Result<Option<String>> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT review_index FROM customers WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map(Option::flatten)
        .map_err(|e| store_error("Failed to load customer review index", e))
    }

    async fn omit_words(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT word FROM omit_words")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("Failed to load omit words", e))
    }

    async fn word_cloud(&self, key: WordCloudKey) -> Result<Option<CachedWordCloud>> {
        let row = sqlx::query_as::<_, WordCloudRow>(
            "SELECT payload, computed_at FROM word_clouds WHERE cache_key = $1",
        )
        .bind(key.cache_key())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load cached word cloud", e))?;

        Ok(row.map(|row| CachedWordCloud {
            payload: row.payload,
            computed_at: row.computed_at,
        }))
    }

    async fn upsert_word_cloud(
        &self,
        key: WordCloudKey,
        payload: &str,
        computed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO word_clouds (cache_key, payload, computed_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (cache_key) DO UPDATE SET
                payload = EXCLUDED.payload,
                computed_at = EXCLUDED.computed_at",
        )
        .bind(key.cache_key())
        .bind(payload)
        .bind(computed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to cache word cloud", e))?;

        Ok(())
    }

    async fn sentiment_override(&self, document_id: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT label FROM sentiment_labels
             WHERE document_id = $1
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to load sentiment override", e))
    }
}
