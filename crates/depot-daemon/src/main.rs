//! depot-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, builds the shared
//! state, wires middleware, and starts the HTTP server.  All route handlers
//! live in `routes.rs`; all shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use depot_daemon::{routes, state};
use depot_db::{PgOrderStore, PgStockStore, SchemaCaps};
use depot_engine::DepotEngine;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    // Layered config: paths from DEPOT_CONFIG (comma-separated), defaults
    // when unset.
    let cfg = load_config_from_env()?;
    let caps = SchemaCaps::new(&cfg.db.stock_quantity_column, &cfg.db.stock_price_column)?;

    let pool = depot_db::connect_from_env().await?;
    let engine = DepotEngine::new(
        Arc::new(PgStockStore::new(pool.clone(), caps)),
        Arc::new(PgOrderStore::new(pool)),
    );

    let shared = Arc::new(state::AppState::new(engine, cfg.depot.depot_id.clone()));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr(&cfg.daemon.bind_addr)?;
    info!("depot-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load_config_from_env() -> anyhow::Result<depot_config::DepotConfig> {
    match std::env::var("DEPOT_CONFIG") {
        Ok(paths) => {
            let refs: Vec<&str> = paths.split(',').map(|s| s.trim()).collect();
            let loaded = depot_config::load_layered_yaml(&refs)?;
            depot_config::DepotConfig::from_loaded(&loaded)
        }
        Err(_) => Ok(depot_config::DepotConfig::default()),
    }
}

/// DEPOT_DAEMON_ADDR overrides the configured bind address.
fn bind_addr(configured: &str) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var("DEPOT_DAEMON_ADDR").unwrap_or_else(|_| configured.to_string());
    raw.parse()
        .with_context(|| format!("invalid bind address: {raw}"))
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
