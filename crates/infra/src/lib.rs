//! Pulse Infrastructure Library
//!
//! Concrete collaborators for the Pulse core: an HTTP search engine client,
//! a PostgreSQL lookup store and logger configuration.

use std::sync::Arc;

use pulse_core::{LookupStore, PulseConfig, Result, SearchEngine};

pub mod elastic;
pub mod logger;
pub mod postgres;

pub use elastic::*;
pub use logger::*;
pub use postgres::*;

/// Infrastructure version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Connected collaborators, ready to hand to a report engine
#[derive(Clone)]
pub struct Infrastructure {
    pub engine: Arc<ElasticClient>,
    pub store: Arc<PgLookupStore>,
}

impl Infrastructure {
    pub fn engine(&self) -> Arc<dyn SearchEngine> {
        self.engine.clone()
    }

    pub fn store(&self) -> Arc<dyn LookupStore> {
        self.store.clone()
    }
}

/// Initialize infrastructure components
pub async fn init_infrastructure(config: &PulseConfig) -> Result<Infrastructure> {
    tracing::info!("Initializing Pulse infrastructure v{}", VERSION);

    let engine = ElasticClient::new(ElasticConfig::from(&config.search))?;
    let store = PgLookupStore::connect(&config.database).await?;
    store.migrate().await?;

    tracing::info!("Search engine URL: {}", config.search.url);

    Ok(Infrastructure {
        engine: Arc::new(engine),
        store: Arc::new(store),
    })
}

/// Health check for infrastructure components
pub async fn health_check(infra: &Infrastructure) -> HealthStatus {
    HealthStatus {
        search_accessible: infra.engine.health_check().await.unwrap_or(false),
        database_accessible: infra.store.health_check().await,
    }
}

/// Health status for infrastructure components
#[derive(Debug, Clone, Default)]
pub struct HealthStatus {
    pub search_accessible: bool,
    pub database_accessible: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.search_accessible && self.database_accessible
    }
}
