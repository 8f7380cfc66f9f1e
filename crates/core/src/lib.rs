//! Pulse Core Library
//!
//! Query construction, aggregation and result shaping for the Pulse
//! analytics backend. This library turns topic configuration and request
//! filters into search-engine requests, runs them, and shapes the bucket
//! results into the flat structures report consumers expect.

pub mod card;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod query;
pub mod report;
pub mod shaper;
pub mod sources;
pub mod store;
pub mod template;
pub mod types;
pub mod wordcloud;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use card::{CardFormatter, DocumentCard};
pub use config::PulseConfig;
pub use context::RequestContext;
pub use engine::{Hit, SearchEngine, SearchResponse};
pub use error::{ErrorCategory, PulseError, Result};
pub use executor::{AggregationExecutor, IndexTarget};
pub use query::{QueryExpression, QueryOptions};
pub use report::{ReportEngine, ShapedMetric};
pub use shaper::PercentageTriple;
pub use store::{CachedWordCloud, LookupStore, WordCloudKey};
pub use template::SearchRequest;
pub use types::{
    DateRange, Family, FilterOverride, ReportRequest, SourceTab, SubTopic, Topic, TouchPoint,
};
pub use wordcloud::{WordCloud, WordCount};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version info as a formatted string
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
