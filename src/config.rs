//! Configuration for the F1 stats service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Named CSV datasets loaded into the store at startup, table name -> path.
    /// Only `race_result` is required by the trend computation.
    #[serde(default = "default_tables")]
    pub tables: HashMap<String, String>,
}

fn default_tables() -> HashMap<String, String> {
    let mut tables = HashMap::new();
    tables.insert(
        "race_result".to_string(),
        "data/race_result.csv".to_string(),
    );
    tables
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            tables: default_tables(),
        }
    }
}

/// Y-axis settings for one chart mode.
///
/// The sensible rank range differs between modes (a full grid of drivers vs
/// roughly ten constructors), so it is configuration rather than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    pub y_min: f64,
    pub y_max: f64,
    /// Rank ticks drawn at 1..=rank_ticks
    pub rank_ticks: u32,
}

/// Chart configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_driver_axis")]
    pub driver: AxisConfig,
    #[serde(default = "default_constructor_axis")]
    pub constructor: AxisConfig,
    /// Line color when a single entity is plotted
    #[serde(default = "default_highlight_color")]
    pub highlight_color: String,
}

fn default_driver_axis() -> AxisConfig {
    AxisConfig {
        y_min: 1.0,
        y_max: 20.0,
        rank_ticks: 20,
    }
}

fn default_constructor_axis() -> AxisConfig {
    AxisConfig {
        y_min: 0.5,
        y_max: 10.5,
        rank_ticks: 10,
    }
}

fn default_highlight_color() -> String {
    "#87ceeb".to_string()
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            driver: default_driver_axis(),
            constructor: default_constructor_axis(),
            highlight_color: default_highlight_color(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Raw constructor name -> display alias (e.g. historical team names
    /// merged under the current one). Users select constructors by alias.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, optionally forcing a specific config file
    pub fn load_from(path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?);

        builder = match path {
            Some(p) => builder.add_source(config::File::with_name(p)),
            // Add config file if exists
            None => builder.add_source(config::File::with_name("config").required(false)),
        };

        // Override with environment variables (F1STATS_SERVER_PORT, etc.)
        let config = builder
            .add_source(
                config::Environment::with_prefix("F1STATS")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Moving-average window sizes offered by the dashboard
pub const WINDOW_PRESETS: [u32; 4] = [1, 5, 10, 20];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.ttl_secs, 600);
        assert!(config.data.tables.contains_key("race_result"));
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_axis_defaults_per_mode() {
        let chart = ChartConfig::default();
        assert_eq!(chart.driver.rank_ticks, 20);
        assert_eq!(chart.constructor.rank_ticks, 10);
        assert!(chart.constructor.y_min < 1.0);
    }
}
