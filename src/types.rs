//! Request and response types for the F1 stats API.

use serde::{Deserialize, Serialize};

use crate::chart::ChartSpec;
use crate::ranking::EntityKind;
use crate::trend::TrendSeries;

/// Trend query request
#[derive(Debug, Clone, Deserialize)]
pub struct TrendRequest {
    pub kind: EntityKind,
    /// Selected drivers, or constructor aliases in constructor mode
    pub entities: Vec<String>,
    /// Trailing moving average window in races
    #[serde(default = "default_window")]
    pub window: u32,
}

fn default_window() -> u32 {
    10
}

/// Trend query response
#[derive(Debug, Clone, Serialize)]
pub struct TrendResponse {
    pub kind: EntityKind,
    pub window: u32,
    pub series: Vec<TrendSeries>,
    pub chart: ChartSpec,
}

/// Query string for the entity listing
#[derive(Debug, Deserialize)]
pub struct EntitiesQuery {
    pub kind: EntityKind,
}

/// Entity listing response
#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub kind: EntityKind,
    pub entities: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Service info response
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub window_presets: Vec<u32>,
    pub entity_kinds: Vec<String>,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
