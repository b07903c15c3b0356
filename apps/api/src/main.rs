mod config;
mod errors;
mod models;
mod posting;
mod routes;
mod state;
mod storage;
mod tailoring;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::posting::web::PostingFetcher;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::FileReportStore;
use crate::tailoring::pipeline::Analyzer;
use crate::tailoring::ruleset::Ruleset;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Retool API v{}", env!("CARGO_PKG_VERSION"));

    // A malformed ruleset is fatal; nothing is analyzed against a partial table.
    let ruleset = Ruleset::load(config.ruleset_path.as_deref())
        .context("failed to load tailoring ruleset")?;
    info!(
        "Ruleset loaded ({} synonym rules, source: {})",
        ruleset.synonyms().len(),
        config
            .ruleset_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "embedded".to_string())
    );
    let analyzer = Analyzer::with_dictionary(Arc::new(ruleset));

    let report_store = Arc::new(FileReportStore::new(&config.report_dir));
    info!("Reports persisted under {}", config.report_dir.display());

    let fetcher = PostingFetcher::new(config.fetch_timeout)
        .context("failed to build posting fetch client")?;

    // Build app state
    let state = AppState {
        analyzer,
        report_store,
        fetcher,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS once a frontend origin exists

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
