// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ingestion routes: position recording and history.

use crate::error::Result;
use crate::models::RecordPositionRequest;
use crate::services::ingest::RecordedPosition;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const MAX_HISTORY_LIMIT: usize = 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/positions", post(record_position))
        .route("/api/vehicles/{id}/history", get(vehicle_history))
        .route("/api/alerts/emergency", post(emergency_alert))
}

/// Record a GPS position sample from a device or mobile collaborator.
async fn record_position(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordPositionRequest>,
) -> Result<Json<RecordedPosition>> {
    let recorded = state.ingest.record_position(request).await?;
    Ok(Json(recorded))
}

#[derive(Deserialize)]
struct HistoryQuery {
    /// Start of the window (RFC3339)
    from: Option<DateTime<Utc>>,
    /// End of the window (RFC3339)
    to: Option<DateTime<Utc>>,
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    100
}

#[derive(Serialize)]
pub struct HistoryEntry {
    pub sample_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub timestamp: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub vehicle_id: Uuid,
    pub samples: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct EmergencyAlertRequest {
    vehicle_id: Uuid,
    #[serde(default = "default_alert_type")]
    alert_type: String,
    #[serde(default)]
    message: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

fn default_alert_type() -> String {
    "EMERGENCY".to_string()
}

#[derive(Serialize)]
pub struct EmergencyAlertResponse {
    pub success: bool,
}

/// Raise an emergency alert from a vehicle/driver. Fanned out to the
/// vehicle's viewers and the owning fleet; best-effort, no replay.
async fn emergency_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EmergencyAlertRequest>,
) -> Result<Json<EmergencyAlertResponse>> {
    let vehicle = crate::services::store_call(
        state.config.store_write_timeout,
        state.store.get_vehicle(request.vehicle_id),
    )
    .await?
    .ok_or_else(|| {
        crate::error::AppError::NotFound(format!("Vehicle {} not found", request.vehicle_id))
    })?;

    let event = crate::services::broadcast::TrackingEvent::EmergencyAlert {
        vehicle_id: vehicle.id,
        alert_type: request.alert_type,
        message: request.message,
        latitude: request.latitude,
        longitude: request.longitude,
        timestamp: Utc::now(),
    };
    state
        .hub
        .publish_emergency(vehicle.id, vehicle.company_id, event);

    Ok(Json(EmergencyAlertResponse { success: true }))
}

/// Newest-first position history for one vehicle.
async fn vehicle_history(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<Uuid>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = params.limit.min(MAX_HISTORY_LIMIT);
    let samples = state
        .ingest
        .position_history(vehicle_id, params.from, params.to, limit)
        .await?;

    let samples = samples
        .into_iter()
        .map(|s| HistoryEntry {
            sample_id: s.id,
            latitude: s.latitude,
            longitude: s.longitude,
            speed: s.speed,
            heading: s.heading,
            timestamp: format_utc_rfc3339(s.timestamp),
            source: s.source,
        })
        .collect();

    Ok(Json(HistoryResponse {
        vehicle_id,
        samples,
    }))
}
