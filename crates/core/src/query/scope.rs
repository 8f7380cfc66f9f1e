//! Sub-topic and touch-point scope refiners
//!
//! Both produce an expression the caller appends to the base topic query.

use tracing::debug;

use super::clause::{Clause, Phrases, QueryExpression};
use super::fields;
use crate::sources::{PRESS_SOURCES, SOCIAL_SOURCES};
use crate::store::LookupStore;
use crate::types::{MonitoringType, SubTopic, TouchPoint};
use crate::Result;

pub async fn build_sub_topic_query_string(
    store: &dyn LookupStore,
    sub_topic_id: i64,
) -> Result<QueryExpression> {
    match store.sub_topic(sub_topic_id).await? {
        Some(sub_topic) => Ok(compose_sub_topic_query(&sub_topic)),
        None => {
            debug!(sub_topic_id, "sub-topic not found, no scope applied");
            Ok(QueryExpression::new())
        }
    }
}

pub async fn build_touch_point_query_string(
    store: &dyn LookupStore,
    touchpoint_id: i64,
) -> Result<QueryExpression> {
    match store.touch_point(touchpoint_id).await? {
        Some(touch_point) => Ok(compose_touch_point_query(&touch_point)),
        None => {
            debug!(touchpoint_id, "touch point not found, no scope applied");
            Ok(QueryExpression::new())
        }
    }
}

pub fn compose_sub_topic_query(sub_topic: &SubTopic) -> QueryExpression {
    let keywords = Phrases::any(sub_topic.keyword_terms());
    let mut expr = QueryExpression::new();

    if !keywords.is_empty() {
        expr = expr.and(Clause::any_field(
            &[fields::MESSAGE_TEXT, fields::USER_SOURCE, fields::FULLNAME],
            &keywords,
        ));
    }

    expr = expr
        .and_not(
            &[fields::MESSAGE_TEXT],
            Phrases::any(sub_topic.exclude_keyword_terms()),
        )
        .and_not(
            &[fields::USERNAME, fields::USER_SOURCE, fields::PROFILE_PHOTO],
            Phrases::any(sub_topic.exclude_account_terms()),
        );

    let explicit = sub_topic.source_terms();
    let sources: Vec<String> = if !explicit.is_empty() {
        explicit
    } else {
        match sub_topic.monitoring() {
            Some(MonitoringType::CustomerExperience) | Some(MonitoringType::Campaign) => {
                SOCIAL_SOURCES.iter().map(|s| s.to_string()).collect()
            }
            Some(MonitoringType::Media) => PRESS_SOURCES.iter().map(|s| s.to_string()).collect(),
            None => Vec::new(),
        }
    };

    expr.and_field(fields::SOURCE, Phrases::any(sources))
}

pub fn compose_touch_point_query(touch_point: &TouchPoint) -> QueryExpression {
    QueryExpression::new().and_field(fields::MESSAGE_TEXT, Phrases::any(touch_point.keyword_terms()))
}
