//! CLI commands for f1-stats-api.
//!
//! Supports API server mode, one-shot trend computation, and entity listing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chart::render_chart;
use crate::config::AppConfig;
use crate::ranking::{self, AliasMap, EntityKind};
use crate::store::InMemoryDb;
use crate::trend;
use crate::types::TrendResponse;

#[derive(Parser)]
#[command(name = "f1-stats-api")]
#[command(version, about = "Formula 1 race trend statistics API and CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Compute a finishing-position trend for selected entities
    Trend {
        /// Entity mode (driver, constructor)
        #[arg(short, long, default_value = "driver")]
        kind: String,

        /// Entities to plot (drivers, or constructor aliases)
        #[arg(short, long, value_delimiter = ',')]
        entities: Vec<String>,

        /// Moving average window in races (dashboard presets: 1, 5, 10, 20)
        #[arg(short, long, default_value_t = 10)]
        window: u32,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Config file override
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List selectable drivers or constructors
    Entities {
        /// Entity mode (driver, constructor)
        #[arg(short, long, default_value = "driver")]
        kind: String,

        /// Config file override
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Run a one-shot trend computation.
pub async fn run_trend(
    kind: String,
    entities: Vec<String>,
    window: u32,
    format: String,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let kind = parse_kind(&kind)?;
    let config = load_config(config_path)?;
    let db = open_store(&config)?;
    let aliases = AliasMap::new(config.aliases.clone());

    eprintln!(
        "Computing {} trend, {} selected, window {}",
        kind.name(),
        entities.len(),
        window
    );

    let series = trend::trend_series(&db, &aliases, kind, &entities, window)?;
    let chart = render_chart(&series, kind, &config.chart);
    let response = TrendResponse {
        kind,
        window,
        series,
        chart,
    };

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        "table" => {
            print_table(&response);
        }
        _ => {
            eprintln!("Unknown format: {}. Using JSON.", format);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

/// List selectable entity names for one mode.
pub async fn run_entities(kind: String, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let kind = parse_kind(&kind)?;
    let config = load_config(config_path)?;
    let db = open_store(&config)?;
    let aliases = AliasMap::new(config.aliases.clone());

    let entities = match kind {
        EntityKind::Driver => db.list_drivers()?,
        EntityKind::Constructor => ranking::constructor_aliases(&db, &aliases)?,
    };

    for name in entities {
        println!("{}", name);
    }

    Ok(())
}

fn parse_kind(kind: &str) -> anyhow::Result<EntityKind> {
    EntityKind::from_str(kind)
        .ok_or_else(|| anyhow::anyhow!("Unknown entity kind: {} (driver, constructor)", kind))
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(p) => AppConfig::load_from(Some(&p.to_string_lossy())),
        None => AppConfig::load(),
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<InMemoryDb> {
    eprintln!("Loading datasets...");
    let db = InMemoryDb::open()?;
    db.load_tables(&config.data.tables)?;
    eprintln!("Loaded {} race results", db.row_count()?);
    Ok(db)
}

/// Print trend results in table format.
fn print_table(response: &TrendResponse) {
    println!(
        "=== {} trend, moving average window {} ===",
        response.kind.name(),
        response.window
    );

    for series in &response.series {
        println!();
        println!("{}", series.entity);
        println!(
            "  {:>6} {:>5} {:>5} {:>8} {:>10}",
            "season", "round", "x", "pos", "avg"
        );
        for point in &series.points {
            let pos = point
                .raw_position
                .map(|v| format!("{:.0}", v))
                .unwrap_or_else(|| "-".to_string());
            let avg = point
                .moving_average
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:>6} {:>5} {:>5} {:>8} {:>10}",
                point.season, point.round, point.season_round_id, pos, avg
            );
        }
    }
}
