//! Document card formatter
//!
//! Projects one raw matched document into the normalized card used by feed
//! metrics. Every key is always present; missing values render as `""`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::engine::Hit;
use crate::sources::{is_youtube, source_icon, DELIMITED_REVIEW_SOURCES, GOOGLE_MY_BUSINESS};
use crate::store::LookupStore;

/// Separator between the review body and trailing metadata in delimited
/// review sources.
pub const REVIEW_DELIMITER: &str = "***|||###";

const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";
const CREATED_AT_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCard {
    pub id: String,
    pub profile_picture: String,
    pub user_fullname: String,
    pub username: String,
    pub followers: String,
    pub following: String,
    pub posts: String,
    pub likes: String,
    pub shares: String,
    pub engagements: String,
    pub content: String,
    pub sentiment: String,
    pub emotion: String,
    pub category: String,
    pub source: String,
    pub source_icon: String,
    pub youtube_video_url: String,
    pub secondary_picture: String,
    pub rating: String,
    pub created_at: String,
}

fn text(source: &Value, field: &str) -> String {
    match &source[field] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn number(source: &Value, field: &str) -> Option<f64> {
    match &source[field] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Plain decimal string, or `""` when missing, zero or negative
fn count_field(source: &Value, field: &str) -> String {
    match number(source, field) {
        Some(value) if value > 0.0 => {
            if value.fract() == 0.0 {
                format!("{}", value as u64)
            } else {
                value.to_string()
            }
        }
        _ => String::new(),
    }
}

fn rating_emotion(rating: f64) -> &'static str {
    if rating >= 4.0 {
        "Supportive"
    } else if rating <= 2.0 {
        "Frustrated"
    } else {
        "Neutral"
    }
}

fn rating_sentiment(rating: f64) -> &'static str {
    if rating >= 4.0 {
        "Positive"
    } else if rating <= 2.0 {
        "Negative"
    } else {
        "Neutral"
    }
}

fn clean_message(source_name: &str, message: &str) -> String {
    if DELIMITED_REVIEW_SOURCES.contains(&source_name) {
        message
            .split(REVIEW_DELIMITER)
            .next()
            .unwrap_or_default()
            .replace('\n', "<br>")
    } else {
        HTML_TAG.replace_all(message, "").into_owned()
    }
}

/// Render a document timestamp in `M/D/YYYY, h:mm:ss AM` form.
pub fn format_created_at(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.naive_utc().format(CREATED_AT_FORMAT).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format(CREATED_AT_FORMAT).to_string();
        }
    }
    raw.to_string()
}

/// Build a card from a hit and an optional manual sentiment label.
pub fn to_card(hit: &Hit, sentiment_override: Option<&str>) -> DocumentCard {
    let doc = &hit.source;
    let source = text(doc, "source");
    let is_gmb = source == GOOGLE_MY_BUSINESS;
    let rating = number(doc, "rating");

    let mut emotion = text(doc, "llm_emotion");
    if emotion.is_empty() && is_gmb {
        if let Some(rating) = rating {
            emotion = rating_emotion(rating).to_string();
        }
    }

    let mut sentiment = match sentiment_override {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => text(doc, "predicted_sentiment_value"),
    };
    if sentiment.is_empty() && is_gmb {
        if let Some(rating) = rating {
            sentiment = rating_sentiment(rating).to_string();
        }
    }

    let (youtube_video_url, secondary_picture) = if is_youtube(&source) {
        let embed = text(doc, "video_embed_url");
        let embed = if embed.is_empty() {
            let post_id = text(doc, "p_id");
            if post_id.is_empty() {
                String::new()
            } else {
                format!("{}{}", YOUTUBE_EMBED_BASE, post_id)
            }
        } else {
            embed
        };
        (embed, String::new())
    } else {
        (String::new(), text(doc, "p_picture_url"))
    };

    let mut created = text(doc, "p_created_time");
    if created.is_empty() {
        created = text(doc, "created_at");
    }

    DocumentCard {
        id: hit.id.clone(),
        profile_picture: text(doc, "u_profile_photo"),
        user_fullname: text(doc, "u_fullname"),
        username: text(doc, "u_username"),
        followers: count_field(doc, "u_followers"),
        following: count_field(doc, "u_following"),
        posts: count_field(doc, "u_posts"),
        likes: count_field(doc, "p_likes"),
        shares: count_field(doc, "p_shares"),
        engagements: count_field(doc, "p_engagement"),
        content: clean_message(&source, &text(doc, "p_message_text")),
        sentiment,
        emotion,
        category: text(doc, "predicted_category"),
        source_icon: format!("{},{}", text(doc, "p_url"), source_icon(&source)),
        source,
        youtube_video_url,
        secondary_picture,
        rating: rating.map(|r| r.to_string()).unwrap_or_default(),
        created_at: format_created_at(&created),
    }
}

/// Formats feed hits, looking up sentiment overrides concurrently.
pub struct CardFormatter {
    store: Arc<dyn LookupStore>,
}

impl CardFormatter {
    pub fn new(store: Arc<dyn LookupStore>) -> Self {
        Self { store }
    }

    pub async fn format(&self, hits: &[Hit]) -> Vec<DocumentCard> {
        let cards = hits.iter().map(|hit| async move {
            let label = match self.store.sentiment_override(&hit.id).await {
                Ok(label) => label,
                Err(e) => {
                    warn!(document_id = %hit.id, error = %e, "sentiment override lookup failed");
                    None
                }
            };
            to_card(hit, label.as_deref())
        });
        join_all(cards).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use serde_json::json;

    fn hit(source: Value) -> Hit {
        Hit {
            id: "doc-1".to_string(),
            source,
        }
    }

    #[test]
    fn test_empty_hit_has_every_key() {
        let card = to_card(&hit(json!({})), None);
        let value = serde_json::to_value(&card).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "profilePicture",
            "followers",
            "following",
            "posts",
            "likes",
            "shares",
            "engagements",
            "content",
            "sentiment",
            "emotion",
            "sourceIcon",
            "youtubeVideoUrl",
            "secondaryPicture",
            "createdAt",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert!(object.values().all(|v| v.is_string()));
        assert_eq!(card.source_icon, ",");
    }

    #[test]
    fn test_numeric_fields() {
        let card = to_card(
            &hit(json!({ "u_followers": 1200, "u_following": 0, "u_posts": -4, "p_likes": "15" })),
            None,
        );
        assert_eq!(card.followers, "1200");
        assert_eq!(card.following, "");
        assert_eq!(card.posts, "");
        assert_eq!(card.likes, "15");
        assert_eq!(card.shares, "");
    }

    #[test]
    fn test_delimited_review_text() {
        let card = to_card(
            &hit(json!({
                "source": "Tripadvisor",
                "p_message_text": "Great <b>stay</b>\nwould return***|||###meta"
            })),
            None,
        );
        assert_eq!(card.content, "Great <b>stay</b><br>would return");

        let card = to_card(
            &hit(json!({ "source": "Twitter", "p_message_text": "<p>Hello\nthere</p>" })),
            None,
        );
        assert_eq!(card.content, "Hello\nthere");
    }

    #[test]
    fn test_gmb_rating_fallbacks() {
        let card = to_card(&hit(json!({ "source": "GoogleMyBusiness", "rating": 5 })), None);
        assert_eq!(card.emotion, "Supportive");
        assert_eq!(card.sentiment, "Positive");

        let card = to_card(&hit(json!({ "source": "GoogleMyBusiness", "rating": 2 })), None);
        assert_eq!(card.emotion, "Frustrated");
        assert_eq!(card.sentiment, "Negative");

        let card = to_card(&hit(json!({ "source": "GoogleMyBusiness", "rating": 3 })), None);
        assert_eq!(card.sentiment, "Neutral");

        let card = to_card(&hit(json!({ "source": "Twitter", "rating": 5 })), None);
        assert_eq!(card.emotion, "");
        assert_eq!(card.sentiment, "");
    }

    #[test]
    fn test_override_label_wins() {
        let card = to_card(
            &hit(json!({ "predicted_sentiment_value": "Negative" })),
            Some("Positive"),
        );
        assert_eq!(card.sentiment, "Positive");
    }

    #[test]
    fn test_youtube_and_icons() {
        let card = to_card(
            &hit(json!({
                "source": "Youtube",
                "p_id": "abc123",
                "p_url": "https://youtu.be/abc123",
                "p_picture_url": "https://img/1.png"
            })),
            None,
        );
        assert_eq!(card.youtube_video_url, "https://www.youtube.com/embed/abc123");
        assert_eq!(card.secondary_picture, "");
        assert_eq!(card.source_icon, "https://youtu.be/abc123,Youtube");

        let card = to_card(
            &hit(json!({ "source": "Blogs", "p_url": "https://b.log", "p_picture_url": "pic" })),
            None,
        );
        assert_eq!(card.youtube_video_url, "");
        assert_eq!(card.secondary_picture, "pic");
        assert_eq!(card.source_icon, "https://b.log,Blog");
    }

    #[test]
    fn test_created_at_formatting() {
        assert_eq!(format_created_at("2023-04-05T14:03:09Z"), "4/5/2023, 2:03:09 PM");
        assert_eq!(format_created_at("2023-01-01 09:00:00"), "1/1/2023, 9:00:00 AM");
        assert_eq!(format_created_at(""), "");

        let card = to_card(&hit(json!({ "created_at": "2023-01-01T00:00:00" })), None);
        assert_eq!(card.created_at, "1/1/2023, 12:00:00 AM");
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let raw = hit(json!({ "source": "Twitter", "u_followers": 3, "p_message_text": "hi" }));
        assert_eq!(to_card(&raw, None), to_card(&raw, None));
    }

    #[tokio::test]
    async fn test_formatter_applies_overrides() {
        let store = MemoryStore::default().with_sentiment_override("doc-1", "Neutral");
        let formatter = CardFormatter::new(Arc::new(store));
        let hits = vec![
            hit(json!({ "predicted_sentiment_value": "Negative" })),
            Hit {
                id: "doc-2".to_string(),
                source: json!({ "predicted_sentiment_value": "Negative" }),
            },
        ];
        let cards = formatter.format(&hits).await;
        assert_eq!(cards[0].sentiment, "Neutral");
        assert_eq!(cards[1].sentiment, "Negative");
    }
}
