//! HTTP surface for the catalog subsystem.
//!
//! Handlers stay thin: translate the wire shapes, call into the resolver
//! or the aggregator, map typed errors onto statuses.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use super::{log_requests, Principal, ServerConfig, ServerState};
use crate::catalog_store::RatedEntity;
use crate::error::CatalogError;
use crate::ratings::RatingAggregator;
use crate::resolver::CatalogResolver;

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = match &self {
            CatalogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound => StatusCode::NOT_FOUND,
            CatalogError::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
            CatalogError::StoreFailure(err) => {
                error!("store failure: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CatalogError::AggregationConflict => StatusCode::CONFLICT,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

#[derive(Deserialize, Debug)]
struct SearchQuery {
    q: Option<String>,
}

async fn search(
    State(resolver): State<Arc<CatalogResolver>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, CatalogError> {
    let results = resolver.search(query.q.as_deref().unwrap_or("")).await?;
    Ok(Json(results).into_response())
}

async fn get_album(
    State(resolver): State<Arc<CatalogResolver>>,
    Path(external_id): Path<String>,
) -> Result<Response, CatalogError> {
    let view = resolver.resolve_album(&external_id).await?;
    Ok(Json(view).into_response())
}

async fn get_artist(
    State(resolver): State<Arc<CatalogResolver>>,
    Path(external_id): Path<String>,
) -> Result<Response, CatalogError> {
    let view = resolver.resolve_artist(&external_id).await?;
    Ok(Json(view).into_response())
}

/// The entity kind arrives as free text; anything outside the closed set
/// is user error, never an identifier to interpolate.
fn parse_entity_type(raw: &str) -> Result<RatedEntity, CatalogError> {
    match raw {
        "album" => Ok(RatedEntity::Album),
        "track" => Ok(RatedEntity::Track),
        other => Err(CatalogError::InvalidInput(format!(
            "unknown entity type: {}",
            other
        ))),
    }
}

#[derive(Deserialize, Debug)]
struct RatingQuery {
    entity_type: String,
    entity_id: i64,
}

#[derive(Deserialize, Debug)]
struct SubmitRatingBody {
    entity_type: String,
    entity_id: i64,
    value: f64,
}

#[derive(Deserialize, Debug)]
struct DeleteRatingBody {
    entity_type: String,
    entity_id: i64,
}

async fn get_rating(
    principal: Principal,
    State(aggregator): State<Arc<RatingAggregator>>,
    Query(query): Query<RatingQuery>,
) -> Result<Response, CatalogError> {
    let entity_type = parse_entity_type(&query.entity_type)?;
    let rating = aggregator.get_rating(&principal.0, entity_type, query.entity_id)?;
    Ok(Json(rating).into_response())
}

async fn submit_rating(
    principal: Principal,
    State(aggregator): State<Arc<RatingAggregator>>,
    Json(body): Json<SubmitRatingBody>,
) -> Result<Response, CatalogError> {
    let entity_type = parse_entity_type(&body.entity_type)?;
    let rating = aggregator.submit_rating(&principal.0, entity_type, body.entity_id, body.value)?;
    Ok(Json(rating).into_response())
}

async fn delete_rating(
    principal: Principal,
    State(aggregator): State<Arc<RatingAggregator>>,
    Json(body): Json<DeleteRatingBody>,
) -> Result<Response, CatalogError> {
    let entity_type = parse_entity_type(&body.entity_type)?;
    let deleted = aggregator.delete_rating(&principal.0, entity_type, body.entity_id)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })).into_response())
}

pub fn make_app(
    config: ServerConfig,
    resolver: Arc<CatalogResolver>,
    aggregator: Arc<RatingAggregator>,
) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        resolver,
        aggregator,
        hash: env!("GIT_HASH").to_string(),
    };

    let content_routes = Router::new()
        .route("/search", get(search))
        .route("/albums/{external_id}", get(get_album))
        .route("/artists/{external_id}", get(get_artist))
        .route(
            "/ratings",
            get(get_rating).post(submit_rating).delete(delete_rating),
        )
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1", content_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(
    config: ServerConfig,
    resolver: Arc<CatalogResolver>,
    aggregator: Arc<RatingAggregator>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, resolver, aggregator);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
