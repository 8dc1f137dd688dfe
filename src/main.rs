//! F1 Stats API
//!
//! REST API and CLI for Formula 1 finishing-position trend statistics.

mod cache;
mod chart;
mod cli;
mod config;
mod ranking;
mod routes;
mod store;
mod trend;
mod types;

use axum::{routing::get, routing::post, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::TrendCache;
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::ranking::AliasMap;
use crate::routes::AppState;
use crate::store::InMemoryDb;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => run_server(Some(host), Some(port)).await,
        Commands::Trend {
            kind,
            entities,
            window,
            format,
            config,
        } => cli::run_trend(kind, entities, window, format, config).await,
        Commands::Entities { kind, config } => cli::run_entities(kind, config).await,
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "f1_stats_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");

    // One-time bulk load; the store is read-only afterwards
    tracing::info!("Loading datasets...");
    let db = InMemoryDb::open()?;
    db.load_tables(&config.data.tables)?;
    tracing::info!("Store ready with {} race results", db.row_count()?);

    let aliases = AliasMap::new(config.aliases.clone());
    let cache = TrendCache::new(config.cache.ttl_secs);

    // Create application state
    let state = Arc::new(AppState {
        db,
        aliases,
        config: config.clone(),
        cache,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/info", get(routes::info))
        .route("/entities", get(routes::entities))
        .route("/trend", post(routes::trend))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
