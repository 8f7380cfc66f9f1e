//! Pulse - social listening analytics backend
//!
//! Builds search-engine queries from saved topic configuration, runs
//! aggregations against the document index and shapes the results for
//! report dashboards.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pulse_core::template::count_template;
use pulse_core::types::{DateRange, SourceTab};
use pulse_core::{
    query::{build_query_for_all_keywords_string, build_query_string},
    PulseConfig, ReportEngine,
};
use pulse_infra::logger::{init_logger, logger_config_from_env, LoggerConfig};
use pulse_infra::{init_infrastructure, PgLookupStore};
use pulse_serve::{AppState, PulseServer, ServerConfig};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pulse - social listening analytics over a document search engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (json, pretty)
    #[arg(short, long, default_value = "pretty", global = true)]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the report API server
    Serve {
        /// Override the configured host address
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the rendered query for a topic
    Query {
        /// Topic id
        #[arg(short, long)]
        topic: i64,

        /// Restrict sources as in SCAD mode
        #[arg(long)]
        scad: bool,

        /// Active SCAD tab (GOOGLE or SOCIAL)
        #[arg(long, default_value = "SOCIAL")]
        tab: String,

        /// Keep every configured URL regardless of tab
        #[arg(long)]
        all_urls: bool,

        /// Also print the count request body for this date range start
        #[arg(long)]
        gte: Option<String>,

        /// Date range end for the printed request body
        #[arg(long)]
        lte: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file to validate (defaults to --config)
        path: Option<PathBuf>,
    },

    /// Check search engine and database connectivity
    Health,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PulseConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let mut logger = LoggerConfig::from(&config.logging);
    if cli.verbose {
        logger.level = "debug".to_string();
    }
    if cli.output == "json" {
        logger.json_format = true;
    }
    init_logger(logger_config_from_env(logger))?;

    match cli.command {
        Some(Commands::Serve { host, port }) => handle_serve(config, host, port).await,
        Some(Commands::Query {
            topic,
            scad,
            ref tab,
            all_urls,
            ref gte,
            ref lte,
        }) => {
            let range = match (gte, lte) {
                (None, None) => None,
                _ => {
                    let default = DateRange::default();
                    Some(DateRange::new(
                        gte.clone().unwrap_or(default.gte),
                        lte.clone().unwrap_or(default.lte),
                    ))
                }
            };
            handle_query(&config, topic, scad, SourceTab::from(tab.as_str()), all_urls, range)
                .await
        }
        Some(Commands::Validate { ref path }) => match path.as_deref().or(cli.config.as_deref()) {
            Some(path) => handle_validate(path, &cli.output),
            None => bail!("No configuration file given"),
        },
        Some(Commands::Health) => handle_health(&config).await,
        Some(Commands::Version) | None => {
            handle_version();
            Ok(())
        }
    }
}

async fn handle_serve(config: PulseConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    config.validate()?;
    let infra = init_infrastructure(&config).await?;

    let reports = ReportEngine::new(infra.engine(), infra.store(), &config);
    let mut server_config = ServerConfig::from(&config.server);
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }

    PulseServer::new(server_config, AppState::new(reports))
        .start()
        .await?;
    Ok(())
}

async fn handle_query(
    config: &PulseConfig,
    topic_id: i64,
    scad: bool,
    tab: SourceTab,
    all_urls: bool,
    range: Option<DateRange>,
) -> Result<()> {
    let store = PgLookupStore::connect(&config.database).await?;

    let query = if all_urls {
        build_query_for_all_keywords_string(&store, topic_id, scad, tab).await?
    } else {
        build_query_string(&store, topic_id, scad, tab).await?
    };
    info!(topic_id, scad, all_urls, "built topic query");

    println!("{}", query.render());
    if let Some(range) = range {
        let body = count_template(&query.render(), &range).count_body();
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    Ok(())
}

fn handle_validate(config_path: &Path, output: &str) -> Result<()> {
    if !config_path.exists() {
        bail!("Configuration file not found: {:?}", config_path);
    }

    let config = PulseConfig::from_file(config_path)?;
    config.validate()?;

    match output {
        "json" => {
            let result = serde_json::json!({
                "valid": true,
                "search_url": config.search.url,
                "primary_index": config.search.primary_index,
                "print_index": config.search.print_index,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Configuration is valid");
            println!("  Search engine: {}", config.search.url);
            println!(
                "  Indices: {} / {}",
                config.search.primary_index, config.search.print_index
            );
            println!("  Listening on: {}:{}", config.server.host, config.server.port);
        }
    }
    Ok(())
}

async fn handle_health(config: &PulseConfig) -> Result<()> {
    let infra = init_infrastructure(config).await?;
    let status = pulse_infra::health_check(&infra).await;

    println!("Search engine: {}", if status.search_accessible { "ok" } else { "unreachable" });
    println!("Database: {}", if status.database_accessible { "ok" } else { "unreachable" });

    if !status.is_healthy() {
        bail!("Health check failed");
    }
    Ok(())
}

fn handle_version() {
    println!("{}", pulse_core::version_info());
    println!("  serve v{}", pulse_serve::VERSION);
    println!("  infra v{}", pulse_infra::VERSION);
}
