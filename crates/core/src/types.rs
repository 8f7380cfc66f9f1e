//! Core type definitions for Pulse

use serde::{Deserialize, Serialize};

use crate::{PulseError, Result};

/// Split a delimited configuration value into trimmed, non-empty terms.
pub fn split_terms(raw: Option<&str>, separator: char) -> Vec<String> {
    raw.map(|value| {
        value
            .split(separator)
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// A saved social-listening configuration.
///
/// List-valued fields are stored the way the configuration store keeps them:
/// hashtags and URLs are `|`-delimited, everything else is `,`-delimited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub keywords: Option<String>,
    pub hashtags: Option<String>,
    pub urls: Option<String>,
    pub exclude_words: Option<String>,
    pub exclude_accounts: Option<String>,
    pub data_sources: Option<String>,
    pub data_locations: Option<String>,
    pub data_languages: Option<String>,
    pub map_location_url: Option<String>,
}

impl Topic {
    pub fn keyword_terms(&self) -> Vec<String> {
        split_terms(self.keywords.as_deref(), ',')
    }

    pub fn hashtag_terms(&self) -> Vec<String> {
        split_terms(self.hashtags.as_deref(), '|')
    }

    pub fn url_terms(&self) -> Vec<String> {
        split_terms(self.urls.as_deref(), '|')
    }

    pub fn exclude_word_terms(&self) -> Vec<String> {
        split_terms(self.exclude_words.as_deref(), ',')
    }

    pub fn exclude_account_terms(&self) -> Vec<String> {
        split_terms(self.exclude_accounts.as_deref(), ',')
    }

    pub fn source_terms(&self) -> Vec<String> {
        split_terms(self.data_sources.as_deref(), ',')
    }

    pub fn location_terms(&self) -> Vec<String> {
        split_terms(self.data_locations.as_deref(), ',')
    }

    pub fn language_terms(&self) -> Vec<String> {
        split_terms(self.data_languages.as_deref(), ',')
    }

    /// Configured map-location URL, if it is non-blank
    pub fn map_url(&self) -> Option<&str> {
        self.map_location_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Which default source set a sub-topic falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringType {
    CustomerExperience,
    Campaign,
    Media,
}

impl MonitoringType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "cx_monitoring" => Some(Self::CustomerExperience),
            "campaign_monitoring" => Some(Self::Campaign),
            "media_monitoring" => Some(Self::Media),
            _ => None,
        }
    }
}

/// A keyword-scoped slice within a topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubTopic {
    pub id: i64,
    pub topic_id: i64,
    pub keywords: Option<String>,
    pub exclude_keywords: Option<String>,
    pub exclude_accounts: Option<String>,
    pub sources: Option<String>,
    pub monitoring_type: Option<String>,
}

impl SubTopic {
    pub fn keyword_terms(&self) -> Vec<String> {
        split_terms(self.keywords.as_deref(), ',')
    }

    pub fn exclude_keyword_terms(&self) -> Vec<String> {
        split_terms(self.exclude_keywords.as_deref(), ',')
    }

    pub fn exclude_account_terms(&self) -> Vec<String> {
        split_terms(self.exclude_accounts.as_deref(), ',')
    }

    pub fn source_terms(&self) -> Vec<String> {
        split_terms(self.sources.as_deref(), ',')
    }

    pub fn monitoring(&self) -> Option<MonitoringType> {
        self.monitoring_type.as_deref().and_then(MonitoringType::parse)
    }
}

/// A keyword-scoped customer-journey contact channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub id: i64,
    pub name: String,
    pub keywords: Option<String>,
}

impl TouchPoint {
    pub fn keyword_terms(&self) -> Vec<String> {
        split_terms(self.keywords.as_deref(), ',')
    }
}

/// Boolean operator joining the values of one clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOp {
    And,
    #[default]
    Or,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Inclusive time window applied to both document time fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub gte: String,
    pub lte: String,
}

impl DateRange {
    pub fn new(gte: impl Into<String>, lte: impl Into<String>) -> Self {
        Self {
            gte: gte.into(),
            lte: lte.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gte.trim().is_empty() || self.lte.trim().is_empty() {
            return Err(PulseError::validation(
                "Date range bounds cannot be empty",
            ));
        }
        Ok(())
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new("now-90d", "now")
    }
}

/// Request-scoped overrides layered on top of a topic's configuration.
///
/// Allow-lists replace the topic's own lists; an empty list or one
/// containing `All` means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOverride {
    pub date_range: Option<DateRange>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub operator: BoolOp,
    pub sentiments: Vec<String>,
    pub sources: Vec<String>,
    pub locations: Vec<String>,
    pub languages: Vec<String>,
}

impl FilterOverride {
    pub fn validate(&self) -> Result<()> {
        if let Some(range) = &self.date_range {
            range.validate()?;
        }
        Ok(())
    }
}

/// Active tab when SCAD mode is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceTab {
    Google,
    #[default]
    Social,
}

impl From<&str> for SourceTab {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("GOOGLE") {
            Self::Google
        } else {
            Self::Social
        }
    }
}

/// Report family served by one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Social,
    Undp,
}

impl Family {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "social" => Some(Self::Social),
            "undp" => Some(Self::Undp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Social => write!(f, "social"),
            Self::Undp => write!(f, "undp"),
        }
    }
}

/// Histogram bucket width for timeline metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Day,
    Week,
    Month,
}

impl Interval {
    pub fn calendar_interval(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// A validated analytics request, ready for the query layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub metric: String,
    pub topic_id: i64,
    pub range: DateRange,
    pub filters: Option<FilterOverride>,
    pub sub_topic_id: Option<i64>,
    pub touchpoint_id: Option<i64>,
    pub account_id: Option<i64>,
    pub scad: bool,
    pub tab: SourceTab,
    pub interval: Interval,
}

impl ReportRequest {
    pub fn new(metric: impl Into<String>, topic_id: i64) -> Self {
        Self {
            metric: metric.into(),
            topic_id,
            range: DateRange::default(),
            filters: None,
            sub_topic_id: None,
            touchpoint_id: None,
            account_id: None,
            scad: false,
            tab: SourceTab::Social,
            interval: Interval::Day,
        }
    }

    /// Date range after applying a filter override, if one carries a range
    pub fn effective_range(&self) -> DateRange {
        self.filters
            .as_ref()
            .and_then(|f| f.date_range.clone())
            .unwrap_or_else(|| self.range.clone())
    }
}
