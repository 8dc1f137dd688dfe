//! Trend series builder: per-entity moving averages on a shared
//! chronological index.
//!
//! Every selected entity gets a trailing moving average of its rank metric,
//! computed in its own race order. The x coordinate is a dense 1-based index
//! over the distinct (season, round) pairs of the whole filtered selection,
//! so entities with different career spans still line up on one timeline.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::ranking::{self, AliasMap, EntityKind, RankedRow};
use crate::store::InMemoryDb;

/// User-correctable failures of the trend query surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrendError {
    #[error("No entities selected")]
    EmptySelection,
    #[error("Moving average window must be at least 1")]
    InvalidWindow,
}

/// One observation in an entity's series.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub season: i32,
    pub round: i32,
    /// Rank metric before smoothing; None for a non-finisher
    pub raw_position: Option<f64>,
    /// Mean of the observed values in the trailing window; None only when
    /// the window holds no observation at all
    pub moving_average: Option<f64>,
    /// Shared chronological x coordinate, 1-based
    pub season_round_id: u32,
}

/// Chronologically ordered trend points for one entity.
#[derive(Debug, Clone, Serialize)]
pub struct TrendSeries {
    pub entity: String,
    pub points: Vec<TrendPoint>,
}

/// Compute the trend query: rank, smooth, index.
///
/// (kind, selected entities, window) in, series grouped by entity out. The
/// empty selection is checked here so the ranking builder never runs
/// without work to do.
pub fn trend_series(
    db: &InMemoryDb,
    aliases: &AliasMap,
    kind: EntityKind,
    selected: &[String],
    window: u32,
) -> anyhow::Result<Vec<TrendSeries>> {
    if selected.is_empty() {
        return Err(TrendError::EmptySelection.into());
    }

    let rows = match kind {
        EntityKind::Driver => ranking::driver_rankings(db, selected)?,
        EntityKind::Constructor => ranking::constructor_rankings(db, aliases, selected)?,
    };

    Ok(build_trend(rows, window)?)
}

/// Build trend series from ranked rows.
///
/// Series come back ordered by first chronological appearance (ties by
/// name), which is also the palette assignment order downstream.
pub fn build_trend(
    mut rows: Vec<RankedRow>,
    window: u32,
) -> Result<Vec<TrendSeries>, TrendError> {
    if window == 0 {
        return Err(TrendError::InvalidWindow);
    }

    // Entity-major chronological order for the rolling pass
    rows.sort_by(|a, b| (&a.entity, a.season, a.round).cmp(&(&b.entity, b.season, b.round)));

    let averages = rolling_means(&rows, window as usize);

    // Dense 1-based index over the union of race keys in the selection
    let race_keys: BTreeSet<(i32, i32)> = rows.iter().map(|r| (r.season, r.round)).collect();
    let index: HashMap<(i32, i32), u32> = race_keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| (key, i as u32 + 1))
        .collect();

    // Group into per-entity series; rows are already contiguous per entity
    let mut series: Vec<TrendSeries> = Vec::new();
    for (row, average) in rows.iter().zip(averages) {
        if series.last().map(|s| s.entity != row.entity).unwrap_or(true) {
            series.push(TrendSeries {
                entity: row.entity.clone(),
                points: Vec::new(),
            });
        }
        if let Some(slot) = series.last_mut() {
            slot.points.push(TrendPoint {
                season: row.season,
                round: row.round,
                raw_position: row.position,
                moving_average: average,
                season_round_id: index[&(row.season, row.round)],
            });
        }
    }

    // First chronological appearance decides plot order
    series.sort_by(|a, b| {
        let a_first = a.points.first().map(|p| p.season_round_id).unwrap_or(0);
        let b_first = b.points.first().map(|p| p.season_round_id).unwrap_or(0);
        (a_first, &a.entity).cmp(&(b_first, &b.entity))
    });

    Ok(series)
}

/// Trailing moving average with min_periods = 1 over each contiguous entity
/// group. Missing observations inside the window are skipped, not zeroed.
fn rolling_means(rows: &[RankedRow], window: usize) -> Vec<Option<f64>> {
    let mut averages = Vec::with_capacity(rows.len());

    let mut start = 0;
    while start < rows.len() {
        let mut end = start;
        while end < rows.len() && rows[end].entity == rows[start].entity {
            end += 1;
        }

        let group = &rows[start..end];
        for i in 0..group.len() {
            let lo = (i + 1).saturating_sub(window);
            let observed: Vec<f64> = group[lo..=i].iter().filter_map(|r| r.position).collect();
            if observed.is_empty() {
                averages.push(None);
            } else {
                averages.push(Some(observed.iter().sum::<f64>() / observed.len() as f64));
            }
        }

        start = end;
    }

    averages
}
