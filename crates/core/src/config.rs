//! Configuration types for Pulse core library

use crate::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PULSE";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PulseConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Search engine settings
    #[serde(default)]
    pub search: SearchSettings,
    /// Lookup store settings
    #[serde(default)]
    pub database: DatabaseSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Word cloud computation and caching
    #[serde(default)]
    pub word_cloud: WordCloudConfig,
    /// Feed-style metrics
    #[serde(default)]
    pub feed: FeedConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
            max_request_size: default_max_request_size(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Search engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Base URL of the search engine
    #[serde(default = "default_search_url")]
    pub url: String,
    /// Index holding social documents
    #[serde(default = "default_primary_index")]
    pub primary_index: String,
    /// Index holding print media documents
    #[serde(default = "default_print_index")]
    pub print_index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    /// Deadline shared by every branch of one fan-out, in milliseconds
    #[serde(default = "default_fan_out_timeout")]
    pub fan_out_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            url: default_search_url(),
            primary_index: default_primary_index(),
            print_index: default_print_index(),
            username: None,
            password: None,
            timeout_secs: default_search_timeout(),
            fan_out_timeout_ms: default_fan_out_timeout(),
        }
    }
}

/// Lookup store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (json, pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Word cloud computation and caching
/// Upper bound on word cloud cache freshness
pub const MAX_FRESHNESS_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordCloudConfig {
    /// Age after which a cached cloud is recomputed
    #[serde(default = "default_freshness_days")]
    pub freshness_days: i64,
    /// Terms requested from the engine before filtering
    #[serde(default = "default_candidate_terms")]
    pub candidate_terms: u64,
    /// Terms kept after filtering and sorting
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
}

impl Default for WordCloudConfig {
    fn default() -> Self {
        Self {
            freshness_days: default_freshness_days(),
            candidate_terms: default_candidate_terms(),
            max_terms: default_max_terms(),
            min_token_length: default_min_token_length(),
        }
    }
}

/// Feed-style metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl PulseConfig {
    /// Load configuration from defaults, an optional YAML/JSON file and
    /// `PULSE__SECTION__KEY` environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(PulseError::not_found(format!(
                    "configuration file {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: PulseConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file without environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        // Try YAML first, then JSON
        match serde_yaml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(_) => {
                let config = serde_json::from_str(&content)?;
                Ok(config)
            }
        }
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.search.url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PulseError::validation(
                "Search engine URL must use http or https scheme",
            ));
        }

        if self.search.primary_index.trim().is_empty() || self.search.print_index.trim().is_empty()
        {
            return Err(PulseError::validation("Index names cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(PulseError::validation("Server port cannot be 0"));
        }

        if self.feed.page_size == 0 {
            return Err(PulseError::validation("Feed page size must be positive"));
        }

        if !(1..=MAX_FRESHNESS_DAYS).contains(&self.word_cloud.freshness_days) {
            return Err(PulseError::validation(format!(
                "Word cloud freshness must be between 1 and {} days",
                MAX_FRESHNESS_DAYS
            )));
        }

        Ok(())
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_request_size() -> usize {
    1024 * 1024
}
fn default_request_timeout() -> u64 {
    60
}
fn default_search_url() -> String {
    "http://localhost:9200".to_string()
}
fn default_primary_index() -> String {
    "social_documents".to_string()
}
fn default_print_index() -> String {
    "print_media".to_string()
}
fn default_search_timeout() -> u64 {
    30
}
fn default_fan_out_timeout() -> u64 {
    15_000
}
fn default_database_url() -> String {
    "postgresql://localhost/pulse".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_freshness_days() -> i64 {
    7
}
fn default_candidate_terms() -> u64 {
    200
}
fn default_max_terms() -> usize {
    100
}
fn default_min_token_length() -> usize {
    4
}
fn default_page_size() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = PulseConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.search.primary_index, "social_documents");
        assert_eq!(config.word_cloud.freshness_days, 7);
        assert_eq!(config.word_cloud.min_token_length, 4);
        assert_eq!(config.feed.page_size, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PulseConfig::default();
        config.search.url = "ftp://search.local".to_string();
        assert!(config.validate().is_err());

        let mut config = PulseConfig::default();
        config.search.print_index = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = PulseConfig::default();
        config.feed.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_freshness_bounds() {
        let mut config = PulseConfig::default();
        config.word_cloud.freshness_days = 0;
        assert!(config.validate().is_err());

        config.word_cloud.freshness_days = MAX_FRESHNESS_DAYS;
        assert!(config.validate().is_ok());

        config.word_cloud.freshness_days = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "search:\n  url: https://es.internal:9200\n  primary_index: posts\n";
        let config: PulseConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.search.url, "https://es.internal:9200");
        assert_eq!(config.search.primary_index, "posts");
        assert_eq!(config.search.print_index, "print_media");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_file_io() {
        let mut config = PulseConfig::default();
        config.server.port = 8088;
        let temp_file = NamedTempFile::new().unwrap();

        config.to_file(temp_file.path()).unwrap();

        let loaded = PulseConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.server.port, 8088);
    }

    #[test]
    fn test_load_layered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.yaml");
        std::fs::write(&path, "feed:\n  page_size: 12\nlogging:\n  level: debug\n").unwrap();

        let config = PulseConfig::load(Some(&path)).unwrap();
        assert_eq!(config.feed.page_size, 12);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let result = PulseConfig::load(Some(Path::new("/nonexistent/pulse.yaml")));
        assert!(matches!(result, Err(PulseError::NotFound { .. })));
    }
}
