//! Report execution
//!
//! [`ReportEngine`] resolves a metric name through the [`registry`], builds
//! the [`RequestContext`](crate::context::RequestContext) and produces one
//! [`ShapedMetric`].

pub mod engine;
pub mod registry;

pub use engine::{ReportEngine, AVE_PRINT_MULTIPLIER, AVE_SOCIAL_MULTIPLIER};
pub use registry::{lookup, Band, MetricSpec, Plan, TimelineDimension, METRICS};

use indexmap::IndexMap;
use serde::Serialize;

use crate::card::DocumentCard;
use crate::shaper::{CategoryMap, PercentageTriple};
use crate::wordcloud::WordCloud;

/// Advertising value equivalent for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AveSummary {
    pub social_mentions: u64,
    pub print_mentions: u64,
    pub ave: f64,
}

/// The single output artifact of a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShapedMetric {
    Count { count: u64 },
    Percentages(PercentageTriple),
    Polarity { positive: u64, negative: u64, total: u64 },
    Series { series: String },
    Timeline(IndexMap<String, String>),
    Categories(CategoryMap),
    Cards(Vec<DocumentCard>),
    WordCloud(WordCloud),
    Ave(AveSummary),
}
