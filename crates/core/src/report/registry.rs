//! Metric registry
//!
//! Every metric a report family serves is one [`MetricSpec`]: a name, the
//! families exposing it and the [`Plan`] describing which fan-out or
//! aggregation it runs and how the result is shaped.

use crate::query::fields;
use crate::types::Family;

const ALL: &[Family] = &[Family::Social, Family::Undp];
const UNDP: &[Family] = &[Family::Undp];

/// A half-open numeric band, `gte <= x < lt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub label: &'static str,
    pub gte: f64,
    pub lt: Option<f64>,
}

const fn band(label: &'static str, gte: f64, lt: Option<f64>) -> Band {
    Band { label, gte, lt }
}

pub const FOLLOWER_TIERS: &[Band] = &[
    band("Nano", 0.0, Some(1_000.0)),
    band("Micro", 1_000.0, Some(10_000.0)),
    band("Mid", 10_000.0, Some(100_000.0)),
    band("Macro", 100_000.0, Some(1_000_000.0)),
    band("Mega", 1_000_000.0, None),
];

pub const SATISFACTION_BANDS: &[Band] = &[
    band("Detractors", 0.0, Some(7.0)),
    band("Passives", 7.0, Some(9.0)),
    band("Promoters", 9.0, None),
];

pub const CHURN_BANDS: &[Band] = &[
    band("Low", 0.0, Some(0.3)),
    band("Medium", 0.3, Some(0.7)),
    band("High", 0.7, None),
];

/// Sub-dimension broken out per histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineDimension {
    Sentiment,
    Polarity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Plan {
    /// Scalar count of the base query
    Total,
    /// Positive and negative shares of the total, neutral as remainder
    SentimentSummary,
    /// Signed polarity filters aggregation
    Polarity,
    /// Fan-out per channel, series in fixed channel order
    ChannelSource,
    /// Fan-out per channel and sentiment
    ChannelSentiment,
    /// Fan-out per topic keyword, sorted descending
    KeywordBreakdown,
    /// Fan-out per touch point of the topic, sorted descending
    TouchpointBreakdown,
    Timeline(TimelineDimension),
    /// Terms aggregation shaped as a pipe series
    TermSeries {
        field: &'static str,
        size: u64,
        with_pct: bool,
    },
    /// Fan-out of range-augmented counts
    RangeBands {
        field: &'static str,
        bands: &'static [Band],
    },
    /// Terms aggregation with a per-term sentiment breakdown
    TermSentiment { field: &'static str, size: u64 },
    Posts,
    WordCloud,
    /// Advertising value equivalent over the primary and print indices
    Ave,
    /// Fan-out per review source and sentiment for an account
    ReviewSources,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub families: &'static [Family],
    pub plan: Plan,
}

pub static METRICS: &[MetricSpec] = &[
    MetricSpec {
        name: "totalMentions",
        families: ALL,
        plan: Plan::Total,
    },
    MetricSpec {
        name: "sentimentSummary",
        families: ALL,
        plan: Plan::SentimentSummary,
    },
    MetricSpec {
        name: "polarity",
        families: ALL,
        plan: Plan::Polarity,
    },
    MetricSpec {
        name: "channelSource",
        families: ALL,
        plan: Plan::ChannelSource,
    },
    MetricSpec {
        name: "channelSentiment",
        families: ALL,
        plan: Plan::ChannelSentiment,
    },
    MetricSpec {
        name: "keywordBreakdown",
        families: ALL,
        plan: Plan::KeywordBreakdown,
    },
    MetricSpec {
        name: "touchpointBreakdown",
        families: ALL,
        plan: Plan::TouchpointBreakdown,
    },
    MetricSpec {
        name: "sentimentTimeline",
        families: ALL,
        plan: Plan::Timeline(TimelineDimension::Sentiment),
    },
    MetricSpec {
        name: "polarityTimeline",
        families: ALL,
        plan: Plan::Timeline(TimelineDimension::Polarity),
    },
    MetricSpec {
        name: "emotions",
        families: ALL,
        plan: Plan::TermSeries {
            field: fields::EMOTION,
            size: 20,
            with_pct: true,
        },
    },
    MetricSpec {
        name: "followerTiers",
        families: ALL,
        plan: Plan::RangeBands {
            field: fields::FOLLOWERS,
            bands: FOLLOWER_TIERS,
        },
    },
    MetricSpec {
        name: "satisfactionBands",
        families: ALL,
        plan: Plan::RangeBands {
            field: fields::SATISFACTION,
            bands: SATISFACTION_BANDS,
        },
    },
    MetricSpec {
        name: "churnBands",
        families: ALL,
        plan: Plan::RangeBands {
            field: fields::CHURN,
            bands: CHURN_BANDS,
        },
    },
    MetricSpec {
        name: "mentionTypes",
        families: ALL,
        plan: Plan::TermSentiment {
            field: fields::POST_TYPE,
            size: 20,
        },
    },
    MetricSpec {
        name: "posts",
        families: ALL,
        plan: Plan::Posts,
    },
    MetricSpec {
        name: "wordCloud",
        families: ALL,
        plan: Plan::WordCloud,
    },
    MetricSpec {
        name: "ave",
        families: ALL,
        plan: Plan::Ave,
    },
    MetricSpec {
        name: "reviewSources",
        families: ALL,
        plan: Plan::ReviewSources,
    },
    MetricSpec {
        name: "unAidsChart",
        families: UNDP,
        plan: Plan::TermSeries {
            field: fields::AID_TYPE,
            size: 50,
            with_pct: false,
        },
    },
    MetricSpec {
        name: "emotionDetector",
        families: UNDP,
        plan: Plan::TermSentiment {
            field: fields::EMOTION_DETECTOR,
            size: 20,
        },
    },
];

/// The metric `name` if `family` serves it
pub fn lookup(family: Family, name: &str) -> Option<&'static MetricSpec> {
    METRICS
        .iter()
        .find(|spec| spec.name == name && spec.families.contains(&family))
}
