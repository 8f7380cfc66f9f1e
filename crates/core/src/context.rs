//! Immutable per-request context
//!
//! Built once from a validated [`ReportRequest`] and threaded through every
//! metric step. Refinements return a new context; nothing is mutated in
//! place.

use crate::query::{Clause, QueryExpression};
use crate::types::{DateRange, FilterOverride, Interval, ReportRequest, Topic};

#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    topic_id: i64,
    topic: Option<Topic>,
    query: QueryExpression,
    rendered: String,
    range: DateRange,
    filters: Option<FilterOverride>,
    sub_topic_id: Option<i64>,
    touchpoint_id: Option<i64>,
    account_id: Option<i64>,
    scad: bool,
    interval: Interval,
}

impl RequestContext {
    pub fn new(topic_id: i64, query: QueryExpression, range: DateRange) -> Self {
        let rendered = query.render();
        Self {
            topic_id,
            topic: None,
            query,
            rendered,
            range,
            filters: None,
            sub_topic_id: None,
            touchpoint_id: None,
            account_id: None,
            scad: false,
            interval: Interval::Day,
        }
    }

    /// Context carrying every scoping field of `request` around `query`
    pub fn from_request(request: &ReportRequest, query: QueryExpression) -> Self {
        Self::new(request.topic_id, query, request.effective_range())
            .with_filters(request.filters.clone())
            .with_sub_topic(request.sub_topic_id)
            .with_touchpoint(request.touchpoint_id)
            .with_account(request.account_id)
            .with_scad(request.scad)
            .with_interval(request.interval)
    }

    #[must_use]
    pub fn with_query(self, query: QueryExpression) -> Self {
        let rendered = query.render();
        Self {
            query,
            rendered,
            ..self
        }
    }

    /// Attach the topic row the query was composed from.
    #[must_use]
    pub fn with_topic(self, topic: Option<Topic>) -> Self {
        Self { topic, ..self }
    }

    #[must_use]
    pub fn with_filters(self, filters: Option<FilterOverride>) -> Self {
        Self { filters, ..self }
    }

    #[must_use]
    pub fn with_sub_topic(self, sub_topic_id: Option<i64>) -> Self {
        Self {
            sub_topic_id,
            ..self
        }
    }

    #[must_use]
    pub fn with_touchpoint(self, touchpoint_id: Option<i64>) -> Self {
        Self {
            touchpoint_id,
            ..self
        }
    }

    #[must_use]
    pub fn with_account(self, account_id: Option<i64>) -> Self {
        Self { account_id, ..self }
    }

    #[must_use]
    pub fn with_scad(self, scad: bool) -> Self {
        Self { scad, ..self }
    }

    #[must_use]
    pub fn with_interval(self, interval: Interval) -> Self {
        Self { interval, ..self }
    }

    pub fn topic_id(&self) -> i64 {
        self.topic_id
    }

    pub fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    pub fn query(&self) -> &QueryExpression {
        &self.query
    }

    /// The base query, rendered once
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    pub fn filters(&self) -> Option<&FilterOverride> {
        self.filters.as_ref()
    }

    pub fn sub_topic_id(&self) -> Option<i64> {
        self.sub_topic_id
    }

    pub fn touchpoint_id(&self) -> Option<i64> {
        self.touchpoint_id
    }

    pub fn account_id(&self) -> Option<i64> {
        self.account_id
    }

    pub fn scad(&self) -> bool {
        self.scad
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Render the base query narrowed by extra clauses.
    pub fn narrowed<I>(&self, clauses: I) -> String
    where
        I: IntoIterator<Item = Clause>,
    {
        clauses
            .into_iter()
            .fold(self.query.clone(), QueryExpression::and)
            .render()
    }

    /// Render the base query narrowed by another expression.
    pub fn narrowed_by(&self, other: &QueryExpression) -> String {
        self.query.clone().and_expr(other).render()
    }
}
