// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fleet-Tracker API Server
//!
//! Ingests GPS position samples, tracks geofence visits and demurrage,
//! and serves clustered fleet map views from a geography-aware cache.

use std::sync::Arc;

use fleet_tracker::{
    config::Config,
    services::GeoCache,
    store::{MemoryStore, SpatialStore},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Fleet-Tracker API");

    // Geo-cache: redis when configured, in-process fallback otherwise
    let cache = GeoCache::connect(&config).await;

    // Spatial store. The in-memory reference implementation backs
    // single-node deployments; a relational spatial store plugs in behind
    // the same trait.
    let store: Arc<dyn SpatialStore> = Arc::new(MemoryStore::new());

    // Build shared state
    let state = AppState::new(config.clone(), store, cache);

    // Background maintenance: periodic view refresh, index and partition
    // housekeeping
    state.maintenance.spawn_periodic();

    // Build router
    let app = fleet_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fleet_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
