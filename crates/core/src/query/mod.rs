//! Query construction
//!
//! This module turns topic configuration and request filters into a
//! full-text query-language expression.
//!
//! # Architecture
//!
//! - `clause`: typed clauses and the immutable [`QueryExpression`]
//! - `builder`: topic query composition
//! - `scope`: sub-topic and touch-point refiners
//!
//! # Usage
//!
//! ```rust
//! use pulse_core::query::{compose_topic_query, QueryOptions};
//! use pulse_core::types::Topic;
//!
//! let topic = Topic {
//!     id: 1,
//!     keywords: Some("flood,relief".to_string()),
//!     ..Default::default()
//! };
//! let expr = compose_topic_query(&topic, &QueryOptions::default());
//! assert!(expr.render().starts_with("p_message_text:(\"flood\" OR \"relief\")"));
//! ```

pub mod builder;
pub mod clause;
pub mod scope;

pub use builder::{
    build_query_for_all_keywords_string, build_query_string, build_topic_query,
    compose_topic_query, with_default_exclusions, QueryOptions, UrlPolicy,
};
pub use clause::{quote, Clause, Phrases, QueryExpression};
pub use scope::{
    build_sub_topic_query_string, build_touch_point_query_string, compose_sub_topic_query,
    compose_touch_point_query,
};

/// Document field names of the search engine schema.
pub mod fields {
    pub const MESSAGE_TEXT: &str = "p_message_text";
    pub const MESSAGE: &str = "p_message";
    pub const FULLNAME: &str = "u_fullname";
    pub const USERNAME: &str = "u_username";
    pub const USER_SOURCE: &str = "u_source";
    pub const PROFILE_PHOTO: &str = "u_profile_photo";
    pub const URL: &str = "p_url";
    pub const PLACE_URL: &str = "place_url";
    pub const SOURCE: &str = "source";
    pub const LOCATION: &str = "u_location";
    pub const LANGUAGE: &str = "lange_detect";
    pub const MANUAL_ENTRY_TYPE: &str = "manual_entry_type";
    pub const SENTIMENT: &str = "predicted_sentiment_value";
    pub const POLARITY: &str = "llm_polarity";
    pub const EMOTION: &str = "llm_emotion";
    pub const CREATED_TIME: &str = "p_created_time";
    pub const CREATED_AT: &str = "created_at";
    pub const FOLLOWERS: &str = "u_followers";
    pub const POST_TYPE: &str = "p_type";
    pub const SATISFACTION: &str = "satisfaction_score";
    pub const CHURN: &str = "churn_probability";
    pub const REVIEW_INDEX: &str = "customer_review_index";
    pub const AID_TYPE: &str = "aid_type";
    pub const EMOTION_DETECTOR: &str = "emotion_detector";
}
