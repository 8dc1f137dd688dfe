//! Chart renderer: turns trend series into a serializable line chart spec.
//!
//! Rendering proper is a frontend concern; this module fixes everything the
//! renderer must not decide for itself: per-series colors, season-boundary
//! tick placement, and the inverted rank axis.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ChartConfig;
use crate::ranking::EntityKind;
use crate::trend::TrendSeries;

#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub x: u32,
    pub y: f64,
}

/// One plotted line
#[derive(Debug, Clone, Serialize)]
pub struct LineSeries {
    pub entity: String,
    pub color: String,
    pub points: Vec<ChartPoint>,
}

/// X-axis tick
#[derive(Debug, Clone, Serialize)]
pub struct Tick {
    pub at: u32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct YAxis {
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<u32>,
    /// Rank 1 belongs at the top
    pub inverted: bool,
}

/// Complete chart description handed to the rendering layer.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub series: Vec<LineSeries>,
    pub x_label: String,
    pub y_label: String,
    pub x_ticks: Vec<Tick>,
    pub y_axis: YAxis,
}

/// Render the chart spec for a set of trend series.
pub fn render_chart(
    series: &[TrendSeries],
    kind: EntityKind,
    config: &ChartConfig,
) -> ChartSpec {
    let axis = match kind {
        EntityKind::Driver => &config.driver,
        EntityKind::Constructor => &config.constructor,
    };

    let colors = palette(series.len(), &config.highlight_color);
    let line_series: Vec<LineSeries> = series
        .iter()
        .zip(colors)
        .map(|(s, color)| LineSeries {
            entity: s.entity.clone(),
            color,
            // Points without an average stay off the line, leaving an x gap
            points: s
                .points
                .iter()
                .filter_map(|p| {
                    p.moving_average.map(|y| ChartPoint {
                        x: p.season_round_id,
                        y,
                    })
                })
                .collect(),
        })
        .collect();

    ChartSpec {
        series: line_series,
        x_label: "Year".to_string(),
        y_label: "Race Position".to_string(),
        x_ticks: season_ticks(series),
        y_axis: YAxis {
            min: axis.y_min,
            max: axis.y_max,
            ticks: (1..=axis.rank_ticks).collect(),
            inverted: true,
        },
    }
}

/// One tick per season, placed at the season's first race on the shared
/// index and labeled with the year. Labeling every race would be clutter.
fn season_ticks(series: &[TrendSeries]) -> Vec<Tick> {
    let mut firsts: BTreeMap<i32, u32> = BTreeMap::new();
    for s in series {
        for p in &s.points {
            firsts
                .entry(p.season)
                .and_modify(|at| {
                    if p.season_round_id < *at {
                        *at = p.season_round_id;
                    }
                })
                .or_insert(p.season_round_id);
        }
    }

    firsts
        .into_iter()
        .map(|(season, at)| Tick {
            at,
            label: season.to_string(),
        })
        .collect()
}

// Diverging palette anchors, cool blue through neutral to warm red
const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 220.0, 220.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

/// One color per series: the highlight color for a lone series, otherwise
/// evenly spaced samples of the diverging ramp in series order.
fn palette(n: usize, highlight: &str) -> Vec<String> {
    if n == 1 {
        return vec![highlight.to_string()];
    }

    (0..n)
        .map(|i| diverging_color(i as f64 / (n - 1) as f64))
        .collect()
}

fn diverging_color(t: f64) -> String {
    let (from, to, local) = if t < 0.5 {
        (COOL, NEUTRAL, t * 2.0)
    } else {
        (NEUTRAL, WARM, (t - 0.5) * 2.0)
    };

    let r = from.0 + (to.0 - from.0) * local;
    let g = from.1 + (to.1 - from.1) * local;
    let b = from.2 + (to.2 - from.2) * local;

    format!(
        "#{:02x}{:02x}{:02x}",
        r.round() as u8,
        g.round() as u8,
        b.round() as u8
    )
}
