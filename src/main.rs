use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tunescore_server::catalog_store::SqliteCatalogStore;
use tunescore_server::config::{AppConfig, CliConfig, FileConfig};
use tunescore_server::musicbrainz::MusicBrainzClient;
use tunescore_server::ratings::RatingAggregator;
use tunescore_server::resolver::CatalogResolver;
use tunescore_server::server::{run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite catalog database file (created if absent).
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file; file values override CLI values.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the metadata service.
    #[clap(long)]
    pub metadata_url: Option<String>,

    /// Base URL of the cover-art service.
    #[clap(long)]
    pub cover_art_url: Option<String>,

    /// Client identifier sent to the metadata service.
    #[clap(long)]
    pub user_agent: Option<String>,

    /// Minimum spacing between outbound remote requests, in milliseconds.
    #[clap(long)]
    pub request_interval_ms: Option<u64>,

    /// Per-call timeout for remote requests, in seconds.
    #[clap(long)]
    pub request_timeout_sec: Option<u64>,

    /// TTL for memoized remote lookups, in seconds.
    #[clap(long)]
    pub cache_ttl_sec: Option<u64>,

    /// Maximum number of entries per remote lookup cache.
    #[clap(long)]
    pub cache_capacity: Option<usize>,
}

async fn run() -> Result<()> {
    let args = CliArgs::parse();

    let file_config = match &args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli = CliConfig {
        db_path: args.db_path,
        port: args.port,
        logging_level: args.logging_level,
        metadata_url: args.metadata_url,
        cover_art_url: args.cover_art_url,
        user_agent: args.user_agent,
        request_interval_ms: args.request_interval_ms,
        request_timeout_sec: args.request_timeout_sec,
        cache_ttl_sec: args.cache_ttl_sec,
        cache_capacity: args.cache_capacity,
    };
    let config = AppConfig::resolve(&cli, file_config)?;

    let store = Arc::new(SqliteCatalogStore::new(&config.db_path)?);
    let remote = Arc::new(MusicBrainzClient::new(config.remote.clone())?);
    let resolver = Arc::new(CatalogResolver::new(store.clone(), remote));
    let aggregator = Arc::new(RatingAggregator::new(store));

    let server_config = ServerConfig {
        port: config.port,
        requests_logging_level: config.logging_level,
    };
    run_server(server_config, resolver, aggregator).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
