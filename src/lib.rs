// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Fleet-Tracker: geospatial tracking and map-performance backend
//!
//! This crate ingests vehicle GPS samples, detects geofence entry/exit to
//! produce billable location visits, and serves map viewports to many
//! concurrent dashboard clients through a geography-aware cache.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use services::{
    BroadcastHub, GeoCache, GeofenceEngine, IngestService, MaintenanceScheduler,
    MapPerformanceService,
};
use store::SpatialStore;

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SpatialStore>,
    pub cache: Arc<GeoCache>,
    pub hub: Arc<BroadcastHub>,
    pub engine: Arc<GeofenceEngine>,
    pub ingest: IngestService,
    pub map: MapPerformanceService,
    pub maintenance: MaintenanceScheduler,
}

impl AppState {
    /// Wire the service graph over a store and cache.
    pub fn new(config: Config, store: Arc<dyn SpatialStore>, cache: GeoCache) -> Arc<Self> {
        let config = Arc::new(config);
        let cache = Arc::new(cache);
        let hub = Arc::new(BroadcastHub::new());

        let maintenance =
            MaintenanceScheduler::new(Arc::clone(&store), Arc::clone(&cache), Arc::clone(&config));
        let engine = Arc::new(GeofenceEngine::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            maintenance.clone(),
            Arc::clone(&config),
        ));
        let ingest = IngestService::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&engine),
            Arc::clone(&hub),
            maintenance.clone(),
            Arc::clone(&config),
        );
        let map =
            MapPerformanceService::new(Arc::clone(&store), Arc::clone(&cache), Arc::clone(&config));

        Arc::new(Self {
            config,
            store,
            cache,
            hub,
            engine,
            ingest,
            map,
            maintenance,
        })
    }
}
