//! Result shaping policies
//!
//! Consumers parse these outputs literally, so the formats here are fixed:
//! two-decimal percentages, `|`-separated series without a trailing
//! delimiter, and category maps that never carry all-zero entries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{filters_counts, HistogramBucket};

/// Sentiment breakdown as percentage strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageTriple {
    pub positive: String,
    pub negative: String,
    pub neutral: String,
}

/// Per-category sub-metric counts.
pub type CategoryMap = IndexMap<String, IndexMap<String, u64>>;

fn hundredths(part: u64, total: u64) -> i64 {
    let total = if total == 0 { 1 } else { total };
    ((part as f64 / total as f64) * 10_000.0).round() as i64
}

fn format_hundredths(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// `part / total * 100` with two decimals; a zero total counts as one.
pub fn percentage(part: u64, total: u64) -> String {
    format_hundredths(hundredths(part, total))
}

/// Positive and negative shares of `total`; neutral is the remainder.
pub fn percentage_triple(positive: u64, negative: u64, total: u64) -> PercentageTriple {
    let pos = hundredths(positive, total);
    let neg = hundredths(negative, total);
    PercentageTriple {
        positive: format_hundredths(pos),
        negative: format_hundredths(neg),
        neutral: format_hundredths(10_000 - pos - neg),
    }
}

/// `"Label,Count|Label,Count"` in the given order.
pub fn pipe_series<S: AsRef<str>>(items: &[(S, u64)]) -> String {
    items
        .iter()
        .map(|(label, count)| format!("{},{}", label.as_ref(), count))
        .collect::<Vec<_>>()
        .join("|")
}

/// `"Label,Count,Pct|..."` where each percentage is against the series sum.
pub fn pipe_series_with_pct<S: AsRef<str>>(items: &[(S, u64)]) -> String {
    let total: u64 = items.iter().map(|(_, count)| count).sum();
    items
        .iter()
        .map(|(label, count)| format!("{},{},{}", label.as_ref(), count, percentage(*count, total)))
        .collect::<Vec<_>>()
        .join("|")
}

/// Stable sort by count, largest first.
pub fn sort_desc<S>(mut items: Vec<(S, u64)>) -> Vec<(S, u64)> {
    items.sort_by(|a, b| b.1.cmp(&a.1));
    items
}

/// Collect categories, dropping every one whose sub-counts are all zero.
pub fn category_map<I>(entries: I) -> CategoryMap
where
    I: IntoIterator<Item = (String, IndexMap<String, u64>)>,
{
    entries
        .into_iter()
        .filter(|(_, counts)| counts.values().any(|count| *count > 0))
        .collect()
}

/// Group flat `((category, dimension), count)` fan-out results into a
/// category map, preserving first-seen order of both keys.
pub fn group_counts<I>(results: I) -> CategoryMap
where
    I: IntoIterator<Item = ((String, String), u64)>,
{
    let mut grouped: CategoryMap = IndexMap::new();
    for ((category, dimension), count) in results {
        grouped.entry(category).or_default().insert(dimension, count);
    }
    category_map(grouped)
}

/// Read the counts of a `filters` sub-aggregation in `dimensions` order.
pub fn dimension_counts(sub: &Value, dimensions: &[&str]) -> IndexMap<String, u64> {
    let counts = filters_counts(sub);
    dimensions
        .iter()
        .map(|dimension| {
            let count = counts
                .iter()
                .find(|(name, _)| name == dimension)
                .map(|(_, count)| *count)
                .unwrap_or(0);
            (dimension.to_string(), count)
        })
        .collect()
}

/// One `"yyyy-MM-dd~count|..."` series per tracked dimension.
pub fn date_series(buckets: &[HistogramBucket], dimensions: &[&str]) -> IndexMap<String, String> {
    let mut series: IndexMap<String, String> = dimensions
        .iter()
        .map(|dimension| (dimension.to_string(), String::new()))
        .collect();

    for bucket in buckets {
        let counts = dimension_counts(&bucket.sub, dimensions);
        for (dimension, count) in counts {
            if let Some(out) = series.get_mut(&dimension) {
                out.push_str(&format!("{}~{}|", bucket.key_as_string, count));
            }
        }
    }

    for out in series.values_mut() {
        if out.ends_with('|') {
            out.pop();
        }
    }
    series
}
