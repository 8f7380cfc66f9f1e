//! Aggregation executor
//!
//! Runs count and search requests against the configured indices. A primary
//! metric's engine failure is logged with its query and returned to the
//! caller; fan-out items degrade to a zero contribution instead.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, warn};

use crate::config::SearchSettings;
use crate::engine::{SearchEngine, SearchResponse};
use crate::template::SearchRequest;
use crate::{PulseError, Result};

/// Which configured index a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    Primary,
    Print,
}

pub struct AggregationExecutor {
    engine: Arc<dyn SearchEngine>,
    primary_index: String,
    print_index: String,
    fan_out_timeout: Duration,
}

impl AggregationExecutor {
    pub fn new(engine: Arc<dyn SearchEngine>, settings: &SearchSettings) -> Self {
        Self {
            engine,
            primary_index: settings.primary_index.clone(),
            print_index: settings.print_index.clone(),
            fan_out_timeout: Duration::from_millis(settings.fan_out_timeout_ms),
        }
    }

    #[must_use]
    pub fn with_fan_out_timeout(mut self, timeout: Duration) -> Self {
        self.fan_out_timeout = timeout;
        self
    }

    fn index(&self, target: IndexTarget) -> &str {
        match target {
            IndexTarget::Primary => &self.primary_index,
            IndexTarget::Print => &self.print_index,
        }
    }

    pub async fn count(&self, request: &SearchRequest) -> Result<u64> {
        self.count_in(IndexTarget::Primary, request).await
    }

    pub async fn count_in(&self, target: IndexTarget, request: &SearchRequest) -> Result<u64> {
        let index = self.index(target);
        debug!(index, query = request.query(), "count");
        self.engine
            .count(index, &request.count_body())
            .await
            .map_err(|e| {
                error!(index, query = request.query(), error = %e, "count request failed");
                e
            })
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let index = self.index(IndexTarget::Primary);
        debug!(index, query = request.query(), size = ?request.size(), "search");
        self.engine
            .search(index, &request.search_body())
            .await
            .map_err(|e| {
                error!(index, query = request.query(), error = %e, "search request failed");
                e
            })
    }

    /// Run labelled counts concurrently under one shared deadline.
    ///
    /// Output order matches input order. An item that fails or misses the
    /// deadline contributes zero.
    pub async fn fan_out_counts<K>(&self, items: Vec<(K, SearchRequest)>) -> Vec<(K, u64)>
    where
        K: Debug + Send,
    {
        let deadline = Instant::now() + self.fan_out_timeout;
        let index = self.index(IndexTarget::Primary);

        let branches = items.into_iter().map(|(label, request)| async move {
            let body = request.count_body();
            let outcome = timeout_at(deadline, self.engine.count(index, &body))
                .await
                .unwrap_or_else(|_| Err(PulseError::timeout(format!("fan-out count {:?}", label))));
            let count = match outcome {
                Ok(count) => count,
                Err(e) => {
                    warn!(
                        item = ?label,
                        query = request.query(),
                        category = %e.category(),
                        error = %e,
                        "fan-out item contributed zero"
                    );
                    0
                }
            };
            (label, count)
        });

        join_all(branches).await
    }
}
