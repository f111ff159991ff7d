// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map query routes: fleet view, fleet bounds, fleet overview.

use crate::error::Result;
use crate::models::BoundingBox;
use crate::services::map_performance::FleetOverview;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/map/fleet", get(fleet_view))
        .route("/api/map/bounds", get(fleet_bounds))
        .route("/api/map/overview", get(fleet_overview))
}

#[derive(Deserialize)]
struct FleetViewQuery {
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
    zoom: u8,
    company_id: Option<Uuid>,
}

/// GeoJSON FeatureCollection for the viewport: clusters below the zoom
/// threshold, individual vehicles at or above it.
async fn fleet_view(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FleetViewQuery>,
) -> Result<Json<serde_json::Value>> {
    let bounds = BoundingBox::new(
        params.min_lat,
        params.min_lng,
        params.max_lat,
        params.max_lng,
    );
    let payload = state
        .map
        .get_fleet_view(&bounds, params.zoom, params.company_id)
        .await?;
    Ok(Json(payload))
}

#[derive(Deserialize)]
struct CompanyQuery {
    company_id: Option<Uuid>,
}

/// Bounding box of the fleet's last-known locations, or null.
async fn fleet_bounds(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompanyQuery>,
) -> Result<Json<Option<BoundingBox>>> {
    let bounds = state.map.get_fleet_bounds(params.company_id).await?;
    Ok(Json(bounds))
}

/// Dashboard fleet summary.
async fn fleet_overview(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompanyQuery>,
) -> Result<Json<FleetOverview>> {
    let overview = state.map.fleet_overview(params.company_id).await?;
    Ok(Json(overview))
}
