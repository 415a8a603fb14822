use crate::ratings::RatingAggregator;
use crate::resolver::CatalogResolver;
use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use super::RequestsLoggingLevel;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub port: u16,
    pub requests_logging_level: RequestsLoggingLevel,
}

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub resolver: Arc<CatalogResolver>,
    pub aggregator: Arc<RatingAggregator>,
    pub hash: String,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for Arc<CatalogResolver> {
    fn from_ref(input: &ServerState) -> Self {
        input.resolver.clone()
    }
}

impl FromRef<ServerState> for Arc<RatingAggregator> {
    fn from_ref(input: &ServerState) -> Self {
        input.aggregator.clone()
    }
}
