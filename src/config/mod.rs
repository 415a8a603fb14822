mod file_config;

pub use file_config::{FileConfig, RemoteConfig};

use crate::musicbrainz::RemoteClientConfig;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that take part in config resolution. Mirrors the fields
/// a TOML config file can override.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub metadata_url: Option<String>,
    pub cover_art_url: Option<String>,
    pub user_agent: Option<String>,
    pub request_interval_ms: Option<u64>,
    pub request_timeout_sec: Option<u64>,
    pub cache_ttl_sec: Option<u64>,
    pub cache_capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub remote: RemoteClientConfig,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let remote_file = file.remote.unwrap_or_default();
        let defaults = RemoteClientConfig::default();
        let remote = RemoteClientConfig {
            metadata_base_url: remote_file
                .metadata_url
                .or_else(|| cli.metadata_url.clone())
                .unwrap_or(defaults.metadata_base_url),
            cover_art_base_url: remote_file
                .cover_art_url
                .or_else(|| cli.cover_art_url.clone())
                .unwrap_or(defaults.cover_art_base_url),
            user_agent: remote_file
                .user_agent
                .or_else(|| cli.user_agent.clone())
                .unwrap_or(defaults.user_agent),
            request_interval: remote_file
                .request_interval_ms
                .or(cli.request_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_interval),
            request_timeout: remote_file
                .request_timeout_sec
                .or(cli.request_timeout_sec)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            cache_ttl: remote_file
                .cache_ttl_sec
                .or(cli.cache_ttl_sec)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            cache_capacity: remote_file
                .cache_capacity
                .or(cli.cache_capacity)
                .unwrap_or(defaults.cache_capacity),
        };

        Ok(AppConfig {
            db_path,
            port,
            logging_level,
            remote,
        })
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
