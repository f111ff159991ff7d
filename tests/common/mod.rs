// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test fixtures: an app wired over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use fleet_tracker::config::Config;
use fleet_tracker::models::{FenceBoundary, FencePolicy, Geofence, RecordPositionRequest, Vehicle};
use fleet_tracker::services::GeoCache;
use fleet_tracker::store::{MemoryStore, SpatialStore};
use fleet_tracker::AppState;
use geo::polygon;
use uuid::Uuid;

/// Config with test-friendly timings (no minute-scale backoffs).
pub fn test_config() -> Config {
    Config {
        maintenance_retry_base_delay: Duration::from_millis(10),
        fleet_refresh_debounce: Duration::from_secs(60),
        geofence_refresh_debounce: Duration::from_secs(60),
        ..Config::default()
    }
}

pub fn test_state() -> Arc<AppState> {
    let config = test_config();
    let store: Arc<dyn SpatialStore> = Arc::new(MemoryStore::new());
    let cache = GeoCache::in_memory(&config);
    AppState::new(config, store, cache)
}

pub async fn seed_vehicle(state: &AppState, company_id: Uuid) -> Vehicle {
    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        company_id,
        registration: format!("TST-{}", &Uuid::new_v4().to_string()[..4]),
        status: "ACTIVE".to_string(),
        last_known_latitude: None,
        last_known_longitude: None,
        last_reported_at: None,
    };
    state.store.upsert_vehicle(&vehicle).await.unwrap();
    vehicle
}

/// A 0.02° square fence centered on (lat, lng), roughly 2 km across.
pub async fn seed_fence(
    state: &AppState,
    company_id: Uuid,
    lat: f64,
    lng: f64,
    policy: FencePolicy,
) -> Geofence {
    let d = 0.01;
    let fence = Geofence {
        id: Uuid::new_v4(),
        company_id,
        name: "Test Terminal".to_string(),
        location_type: "DEPOT".to_string(),
        boundary: FenceBoundary::Polygon(polygon![
            (x: lng - d, y: lat - d),
            (x: lng + d, y: lat - d),
            (x: lng + d, y: lat + d),
            (x: lng - d, y: lat + d),
            (x: lng - d, y: lat - d),
        ]),
        policy,
        demurrage_enabled: true,
        free_time_hours: 2.0,
        demurrage_rate_per_hour: Some(50.0),
        is_active: true,
    };
    state.store.upsert_geofence(&fence).await.unwrap();
    fence
}

pub fn position_request(vehicle_id: Uuid, lat: f64, lng: f64, timestamp: &str) -> RecordPositionRequest {
    RecordPositionRequest {
        vehicle_id,
        latitude: lat,
        longitude: lng,
        timestamp: timestamp.parse().unwrap(),
        shipment_id: None,
        speed: Some(35.0),
        heading: Some(90.0),
        accuracy: Some(5.0),
        battery_level: None,
        signal_strength: None,
        source: "GPS_DEVICE".to_string(),
    }
}
