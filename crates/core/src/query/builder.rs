//! Topic query builder
//!
//! Translates a topic's keyword/hashtag/URL/exclusion configuration plus
//! request-scoped overrides into a [`QueryExpression`].

use tracing::debug;

use super::clause::{Clause, Phrases, QueryExpression};
use super::fields;
use crate::sources::{GOOGLE_SOURCES, MANUAL_ENTRY_REVIEW, SOCIAL_SOURCES, SOURCE_DIRECT_MESSAGE};
use crate::store::LookupStore;
use crate::types::{FilterOverride, SourceTab, Topic};
use crate::Result;

/// How URL terms are treated in SCAD mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlPolicy {
    /// Keep only Google URLs on the Google tab and only non-Google URLs otherwise
    #[default]
    RestrictByTab,
    /// Keep every configured URL
    RetainAll,
}

/// Per-request knobs of the topic query builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions<'a> {
    pub scad: bool,
    pub tab: SourceTab,
    pub url_policy: UrlPolicy,
    pub filters: Option<&'a FilterOverride>,
}

impl<'a> QueryOptions<'a> {
    pub fn new(scad: bool, tab: SourceTab) -> Self {
        Self {
            scad,
            tab,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: Option<&'a FilterOverride>) -> Self {
        self.filters = filters;
        self
    }
}

/// Build the query for a topic, restricting URL terms by tab in SCAD mode.
///
/// A missing topic yields an empty expression, which callers treat as
/// "match broad defaults".
pub async fn build_query_string(
    store: &dyn LookupStore,
    topic_id: i64,
    scad: bool,
    tab: SourceTab,
) -> Result<QueryExpression> {
    build_topic_query(store, topic_id, &QueryOptions::new(scad, tab)).await
}

/// Build the query used for cross-topic totals: every configured URL is kept
/// regardless of SCAD mode or tab.
pub async fn build_query_for_all_keywords_string(
    store: &dyn LookupStore,
    topic_id: i64,
    scad: bool,
    tab: SourceTab,
) -> Result<QueryExpression> {
    let options = QueryOptions::new(scad, tab).url_policy(UrlPolicy::RetainAll);
    build_topic_query(store, topic_id, &options).await
}

pub async fn build_topic_query(
    store: &dyn LookupStore,
    topic_id: i64,
    options: &QueryOptions<'_>,
) -> Result<QueryExpression> {
    match store.topic(topic_id).await? {
        Some(topic) => Ok(compose_topic_query(&topic, options)),
        None => {
            debug!(topic_id, "topic not found, using empty query");
            Ok(QueryExpression::new())
        }
    }
}

/// Pure composition of a topic query.
pub fn compose_topic_query(topic: &Topic, options: &QueryOptions<'_>) -> QueryExpression {
    let filters = options.filters;
    let all_urls = topic.url_terms();

    let urls: Vec<String> = all_urls
        .iter()
        .filter(|url| url_allowed(url, options))
        .cloned()
        .collect();

    let mut terms: Vec<String> = Vec::new();
    for term in topic.hashtag_terms().into_iter().chain(topic.keyword_terms()) {
        if !all_urls.contains(&term) && !terms.contains(&term) {
            terms.push(term);
        }
    }

    let mut expr = QueryExpression::new().and(head_clause(topic, Phrases::any(terms), urls));

    if let Some(filters) = filters {
        expr = expr.and_field(
            fields::MESSAGE_TEXT,
            Phrases::with_op(filters.include_tags.iter().cloned(), filters.operator),
        );
    }

    expr = expr.and_not(&[fields::MESSAGE_TEXT], Phrases::any(topic.exclude_word_terms()));

    if let Some(filters) = filters {
        expr = expr.and_not(
            &[fields::MESSAGE_TEXT],
            Phrases::any(filters.exclude_tags.iter().cloned()),
        );
    }

    expr = expr.and_not(
        &[fields::USERNAME, fields::USER_SOURCE],
        Phrases::any(topic.exclude_account_terms()),
    );

    if let Some(filters) = filters {
        expr = expr.and_field(fields::SENTIMENT, allow_list(&filters.sentiments));
    }

    let sources = if options.scad {
        match options.tab {
            SourceTab::Google => to_owned(GOOGLE_SOURCES),
            SourceTab::Social => to_owned(SOCIAL_SOURCES),
        }
    } else {
        override_or(filters.map(|f| &f.sources), topic.source_terms())
    };
    expr = expr.and_field(fields::SOURCE, allow_list(&sources));

    let locations = override_or(filters.map(|f| &f.locations), topic.location_terms());
    expr = expr.and_field(fields::LOCATION, allow_list(&locations));

    let languages = override_or(filters.map(|f| &f.languages), topic.language_terms());
    expr = expr.and_field(fields::LANGUAGE, allow_list(&languages));

    with_default_exclusions(expr)
}

/// Direct messages and manually entered reviews never count as mentions.
pub fn with_default_exclusions(expr: QueryExpression) -> QueryExpression {
    expr.and_not(&[fields::SOURCE], Phrases::any([SOURCE_DIRECT_MESSAGE]))
        .and_not(&[fields::MANUAL_ENTRY_TYPE], Phrases::any([MANUAL_ENTRY_REVIEW]))
}

fn head_clause(topic: &Topic, phrases: Phrases, urls: Vec<String>) -> Clause {
    if !urls.is_empty() {
        let url_phrases = Phrases::any(urls);
        let mut parts = Vec::with_capacity(4);
        if !phrases.is_empty() {
            parts.push(Clause::field(fields::MESSAGE_TEXT, phrases.clone()));
            parts.push(Clause::field(fields::FULLNAME, phrases));
        }
        parts.push(Clause::field(fields::USER_SOURCE, url_phrases.clone()));
        parts.push(Clause::field(fields::URL, url_phrases));
        return Clause::AnyOf(parts);
    }

    if let Some(map_url) = topic.map_url() {
        let place = Clause::field(fields::PLACE_URL, Phrases::any([map_url]));
        if phrases.is_empty() {
            return place;
        }
        return Clause::AnyOf(vec![Clause::field(fields::MESSAGE_TEXT, phrases), place]);
    }

    Clause::field(fields::MESSAGE_TEXT, phrases)
}

fn url_allowed(url: &str, options: &QueryOptions<'_>) -> bool {
    if !options.scad || options.url_policy == UrlPolicy::RetainAll {
        return true;
    }
    let is_google = url.to_lowercase().contains("google");
    match options.tab {
        SourceTab::Google => is_google,
        SourceTab::Social => !is_google,
    }
}

/// An allow-list containing `All` places no restriction.
fn allow_list(values: &[String]) -> Phrases {
    if values.iter().any(|v| v.trim().eq_ignore_ascii_case("all")) {
        return Phrases::default();
    }
    Phrases::any(
        values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string),
    )
}

fn override_or(values: Option<&Vec<String>>, fallback: Vec<String>) -> Vec<String> {
    match values {
        Some(values) if !values.is_empty() => values.clone(),
        _ => fallback,
    }
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use crate::types::BoolOp;

    const TRAILER: &str = "NOT source:(\"DM\") AND NOT manual_entry_type:(\"review\")";

    fn flood_topic() -> Topic {
        Topic {
            id: 1,
            keywords: Some("flood,relief".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_keywords_only() {
        let expr = compose_topic_query(&flood_topic(), &QueryOptions::default());
        assert_eq!(
            expr.render(),
            format!("p_message_text:(\"flood\" OR \"relief\") AND {}", TRAILER)
        );
    }

    #[test]
    fn test_empty_topic_matches_nothing() {
        let topic = Topic {
            id: 2,
            ..Default::default()
        };
        let expr = compose_topic_query(&topic, &QueryOptions::default());
        assert!(expr.render().starts_with("p_message_text:()"));
    }

    #[test]
    fn test_hashtags_come_first_and_dedupe() {
        let topic = Topic {
            id: 3,
            keywords: Some("aid, #aid".to_string()),
            hashtags: Some("#aid|#relief".to_string()),
            ..Default::default()
        };
        let expr = compose_topic_query(&topic, &QueryOptions::default());
        assert!(expr
            .render()
            .starts_with("p_message_text:(\"#aid\" OR \"#relief\" OR \"aid\")"));
    }

    #[test]
    fn test_urls_widen_field_set() {
        let topic = Topic {
            id: 4,
            keywords: Some("bank".to_string()),
            urls: Some("https://facebook.com/bank".to_string()),
            ..Default::default()
        };
        let expr = compose_topic_query(&topic, &QueryOptions::default());
        assert!(expr.render().starts_with(
            "(p_message_text:(\"bank\") OR u_fullname:(\"bank\") OR \
             u_source:(\"https://facebook.com/bank\") OR p_url:(\"https://facebook.com/bank\"))"
        ));
    }

    #[test]
    fn test_map_url_fallback() {
        let topic = Topic {
            id: 5,
            keywords: Some("museum".to_string()),
            map_location_url: Some("https://maps.google.com/?cid=1".to_string()),
            ..Default::default()
        };
        let expr = compose_topic_query(&topic, &QueryOptions::default());
        assert!(expr.render().starts_with(
            "(p_message_text:(\"museum\") OR place_url:(\"https://maps.google.com/?cid=1\"))"
        ));
    }

    #[test]
    fn test_exclusions_and_allow_lists() {
        let topic = Topic {
            id: 6,
            keywords: Some("flood".to_string()),
            exclude_words: Some("movie".to_string()),
            exclude_accounts: Some("spam_bot".to_string()),
            data_sources: Some("Twitter,Facebook".to_string()),
            data_locations: Some("Pakistan".to_string()),
            data_languages: Some("en,ur".to_string()),
            ..Default::default()
        };
        let expr = compose_topic_query(&topic, &QueryOptions::default());
        assert_eq!(
            expr.render(),
            format!(
                "p_message_text:(\"flood\") AND NOT p_message_text:(\"movie\") AND \
                 NOT (u_username:(\"spam_bot\") OR u_source:(\"spam_bot\")) AND \
                 source:(\"Twitter\" OR \"Facebook\") AND u_location:(\"Pakistan\") AND \
                 lange_detect:(\"en\" OR \"ur\") AND {}",
                TRAILER
            )
        );
    }

    #[test]
    fn test_scad_google_tab_restricts_urls_and_sources() {
        let topic = Topic {
            id: 7,
            urls: Some("https://google.com/maps/place/x|https://twitter.com/x".to_string()),
            data_sources: Some("Twitter".to_string()),
            ..Default::default()
        };
        let options = QueryOptions::new(true, SourceTab::Google);
        let rendered = compose_topic_query(&topic, &options).render();
        assert!(rendered.contains("u_source:(\"https://google.com/maps/place/x\")"));
        assert!(!rendered.contains("twitter.com"));
        assert!(rendered.contains("source:(\"GoogleMyBusiness\")"));
        assert!(!rendered.contains("source:(\"Twitter\")"));

        let options = QueryOptions::new(true, SourceTab::Social);
        let rendered = compose_topic_query(&topic, &options).render();
        assert!(rendered.contains("https://twitter.com/x"));
        assert!(!rendered.contains("google.com/maps"));
    }

    #[test]
    fn test_all_keywords_variant_keeps_every_url() {
        let topic = Topic {
            id: 8,
            urls: Some("https://google.com/maps/place/x|https://twitter.com/x".to_string()),
            ..Default::default()
        };
        let options =
            QueryOptions::new(true, SourceTab::Google).url_policy(UrlPolicy::RetainAll);
        let rendered = compose_topic_query(&topic, &options).render();
        assert!(rendered.contains("google.com/maps"));
        assert!(rendered.contains("twitter.com/x"));
    }

    #[test]
    fn test_filter_override_replaces_lists() {
        let topic = Topic {
            data_sources: Some("Twitter".to_string()),
            ..flood_topic()
        };
        let filters = FilterOverride {
            include_tags: vec!["water".to_string(), "food".to_string()],
            operator: BoolOp::And,
            exclude_tags: vec!["rumour".to_string()],
            sentiments: vec!["Negative".to_string()],
            sources: vec!["Instagram".to_string()],
            ..Default::default()
        };
        let options = QueryOptions::default().filters(Some(&filters));
        let rendered = compose_topic_query(&topic, &options).render();
        assert!(rendered.contains("p_message_text:(\"water\" AND \"food\")"));
        assert!(rendered.contains("NOT p_message_text:(\"rumour\")"));
        assert!(rendered.contains("predicted_sentiment_value:(\"Negative\")"));
        assert!(rendered.contains("source:(\"Instagram\")"));
        assert!(!rendered.contains("\"Twitter\""));
    }

    #[test]
    fn test_all_source_means_unrestricted() {
        let topic = Topic {
            data_sources: Some("All".to_string()),
            ..flood_topic()
        };
        let rendered = compose_topic_query(&topic, &QueryOptions::default()).render();
        assert_eq!(
            rendered,
            format!("p_message_text:(\"flood\" OR \"relief\") AND {}", TRAILER)
        );
    }

    #[tokio::test]
    async fn test_missing_topic_yields_empty_expression() {
        let store = MemoryStore::default();
        let expr = build_query_string(&store, 404, false, SourceTab::Social)
            .await
            .unwrap();
        assert!(expr.is_empty());
        assert_eq!(expr.render(), "");
    }

    #[tokio::test]
    async fn test_build_from_store() {
        let store = MemoryStore::default().with_topic(flood_topic());
        let expr = build_query_for_all_keywords_string(&store, 1, false, SourceTab::Social)
            .await
            .unwrap();
        assert!(expr.render().starts_with("p_message_text:(\"flood\" OR \"relief\")"));
    }
}
