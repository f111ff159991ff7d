// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operational control surface: cache invalidation, forced refreshes,
//! diagnostics. Not part of the normal request flow.

use crate::error::{AppError, Result};
use crate::models::{FenceBoundary, FencePolicy, Geofence};
use crate::services::geocache::{CacheStats, MarkerState};
use crate::services::maintenance::JobKind;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/geofences", post(upsert_geofence))
        .route("/api/admin/cache/invalidate", post(invalidate_region))
        .route("/api/admin/cache/stats", get(cache_stats))
        .route("/api/admin/maintenance/refresh", post(force_refresh))
}

#[derive(Deserialize)]
struct UpsertGeofenceRequest {
    /// Omit to create a new geofence
    id: Option<Uuid>,
    company_id: Uuid,
    name: String,
    #[serde(default = "default_location_type")]
    location_type: String,
    /// GeoJSON Polygon or MultiPolygon geometry
    boundary: serde_json::Value,
    #[serde(default = "default_policy")]
    policy: FencePolicy,
    #[serde(default)]
    demurrage_enabled: bool,
    #[serde(default)]
    free_time_hours: f64,
    demurrage_rate_per_hour: Option<f64>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_location_type() -> String {
    "DEPOT".to_string()
}

fn default_policy() -> FencePolicy {
    FencePolicy::Inclusion
}

fn default_active() -> bool {
    true
}

#[derive(Serialize)]
pub struct UpsertGeofenceResponse {
    pub geofence_id: Uuid,
}

/// Create or update a geofence. The change invalidates cached map tiles
/// covering its area and schedules a statistics refresh.
async fn upsert_geofence(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpsertGeofenceRequest>,
) -> Result<Json<UpsertGeofenceResponse>> {
    let boundary = FenceBoundary::from_geojson_str(&request.boundary.to_string())
        .map_err(|e| AppError::Validation(format!("Invalid boundary: {}", e)))?;

    let fence = Geofence {
        id: request.id.unwrap_or_else(Uuid::new_v4),
        company_id: request.company_id,
        name: request.name,
        location_type: request.location_type,
        boundary,
        policy: request.policy,
        demurrage_enabled: request.demurrage_enabled,
        free_time_hours: request.free_time_hours,
        demurrage_rate_per_hour: request.demurrage_rate_per_hour,
        is_active: request.is_active,
    };

    state.engine.apply_geofence_change(&fence).await?;

    Ok(Json(UpsertGeofenceResponse {
        geofence_id: fence.id,
    }))
}

#[derive(Deserialize)]
struct InvalidateRegionRequest {
    center_lat: f64,
    center_lng: f64,
    radius_km: Option<f64>,
    company_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct InvalidateRegionResponse {
    pub deleted_keys: u64,
}

/// Invalidate cached map data within a geographic region.
async fn invalidate_region(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InvalidateRegionRequest>,
) -> Result<Json<InvalidateRegionResponse>> {
    if !(-90.0..=90.0).contains(&request.center_lat)
        || !(-180.0..=180.0).contains(&request.center_lng)
    {
        return Err(AppError::Validation(
            "center must be within [-90,90]/[-180,180]".to_string(),
        ));
    }

    let radius_km = request
        .radius_km
        .unwrap_or(state.config.position_invalidation_radius_km);
    let deleted_keys = state
        .cache
        .invalidate_region(
            request.center_lat,
            request.center_lng,
            radius_km,
            request.company_id,
        )
        .await?;

    Ok(Json(InvalidateRegionResponse { deleted_keys }))
}

#[derive(Deserialize)]
struct ForceRefreshRequest {
    /// Job name, e.g. "refresh_fleet_summary"
    job: String,
    /// Company or geofence id the job targets, depending on the kind
    target: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ForceRefreshResponse {
    pub job: String,
    pub scheduled: bool,
}

/// Schedule a maintenance job now, bypassing the conditional refresh
/// policy. Debounced: a job already scheduled for the same target
/// reports `scheduled: false`.
async fn force_refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForceRefreshRequest>,
) -> Result<Json<ForceRefreshResponse>> {
    let kind = JobKind::parse(&request.job)
        .ok_or_else(|| AppError::Validation(format!("Unknown job: {}", request.job)))?;

    let marker = state.maintenance.force_refresh(kind, request.target).await;

    Ok(Json(ForceRefreshResponse {
        job: request.job,
        scheduled: marker == MarkerState::Acquired,
    }))
}

/// Cache hit/miss diagnostics.
async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}
