//! API route handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::cache::{TrendCache, TrendKey};
use crate::chart::render_chart;
use crate::config::{AppConfig, WINDOW_PRESETS};
use crate::ranking::{self, AliasMap, EntityKind};
use crate::store::InMemoryDb;
use crate::trend::{self, TrendError};
use crate::types::{
    EntitiesQuery, EntitiesResponse, ErrorResponse, HealthResponse, InfoResponse, TrendRequest,
    TrendResponse,
};

/// Application state shared across handlers.
pub struct AppState {
    pub db: InMemoryDb,
    pub aliases: AliasMap,
    pub config: AppConfig,
    pub cache: TrendCache,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.status.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Service info endpoint.
pub async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        window_presets: WINDOW_PRESETS.to_vec(),
        entity_kinds: vec![
            EntityKind::Driver.name().to_string(),
            EntityKind::Constructor.name().to_string(),
        ],
    })
}

/// Selectable entity names for one mode. Constructor names are the
/// display aliases, because selection happens by alias.
pub async fn entities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EntitiesQuery>,
) -> Result<Json<EntitiesResponse>, ApiError> {
    let entities = match query.kind {
        EntityKind::Driver => state.db.list_drivers(),
        EntityKind::Constructor => ranking::constructor_aliases(&state.db, &state.aliases),
    }
    .map_err(|e| ApiError::internal(format!("Entity listing failed: {}", e)))?;

    Ok(Json(EntitiesResponse {
        kind: query.kind,
        entities,
    }))
}

/// Trend endpoint.
pub async fn trend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrendRequest>,
) -> Result<Json<TrendResponse>, ApiError> {
    let key = TrendKey::new(req.kind, &req.entities, req.window);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let series = trend::trend_series(
        &state.db,
        &state.aliases,
        req.kind,
        &req.entities,
        req.window,
    )
    .map_err(|e| match e.downcast_ref::<TrendError>() {
        Some(user_error) => ApiError::bad_request(user_error.to_string()),
        None => ApiError::internal(format!("Trend computation failed: {}", e)),
    })?;

    let chart = render_chart(&series, req.kind, &state.config.chart);
    let response = TrendResponse {
        kind: req.kind,
        window: req.window,
        series,
        chart,
    };
    state.cache.set(key, response.clone());

    Ok(Json(response))
}
