use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,

    // Remote client settings
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    pub metadata_url: Option<String>,
    pub cover_art_url: Option<String>,
    pub user_agent: Option<String>,
    pub request_interval_ms: Option<u64>,
    pub request_timeout_sec: Option<u64>,
    pub cache_ttl_sec: Option<u64>,
    pub cache_capacity: Option<usize>,
}

impl FileConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_partial_config() {
        let config: FileConfig = toml::from_str(
            r#"
            port = 4000

            [remote]
            metadata_url = "http://localhost:9999"
            request_interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(4000));
        assert!(config.db_path.is_none());
        let remote = config.remote.unwrap();
        assert_eq!(remote.metadata_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(remote.request_interval_ms, Some(250));
        assert!(remote.user_agent.is_none());
    }

    #[test]
    fn empty_config_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.port.is_none());
        assert!(config.remote.is_none());
    }
}
