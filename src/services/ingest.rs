// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS ingestion service.
//!
//! Handles the core workflow:
//! 1. Validate the incoming sample
//! 2. Persist it (append-only)
//! 3. Advance the vehicle's last-known state (last-writer-wins by sample time)
//! 4. Run the geofence sweep, opening/closing visits
//! 5. Broadcast the update and any geofence events
//! 6. Dispatch cache invalidation and maintenance without blocking the caller

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{PositionSample, RecordPositionRequest, Vehicle};
use crate::services::broadcast::{
    fleet_group, vehicle_group, BroadcastHub, TrackingEvent,
};
use crate::services::geocache::GeoCache;
use crate::services::geofence::{FenceTransition, GeofenceEngine};
use crate::services::maintenance::MaintenanceScheduler;
use crate::services::store_call;
use crate::store::SpatialStore;

/// Result of recording a position sample.
#[derive(Debug, Serialize)]
pub struct RecordedPosition {
    pub sample_id: Uuid,
    pub vehicle_id: Uuid,
    /// Whether this sample advanced the vehicle's last-known state.
    pub position_advanced: bool,
    /// The vehicle's last-known location after this sample was applied.
    pub last_known_latitude: Option<f64>,
    pub last_known_longitude: Option<f64>,
    pub last_reported_at: Option<DateTime<Utc>>,
    /// Number of visits opened or closed by this sample.
    pub geofence_events: usize,
}

pub struct IngestService {
    store: Arc<dyn SpatialStore>,
    cache: Arc<GeoCache>,
    engine: Arc<GeofenceEngine>,
    hub: Arc<BroadcastHub>,
    maintenance: MaintenanceScheduler,
    config: Arc<Config>,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn SpatialStore>,
        cache: Arc<GeoCache>,
        engine: Arc<GeofenceEngine>,
        hub: Arc<BroadcastHub>,
        maintenance: MaintenanceScheduler,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            cache,
            engine,
            hub,
            maintenance,
            config,
        }
    }

    /// Record one position sample. Failures here affect only this sample;
    /// there is no transaction spanning vehicles.
    pub async fn record_position(&self, request: RecordPositionRequest) -> Result<RecordedPosition> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let vehicle = store_call(
            self.config.store_write_timeout,
            self.store.get_vehicle(request.vehicle_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", request.vehicle_id)))?;

        let sample = request.into_sample();
        store_call(
            self.config.store_write_timeout,
            self.store.insert_position(&sample),
        )
        .await?;

        let position_advanced = store_call(
            self.config.store_write_timeout,
            self.store.advance_vehicle_position(
                sample.vehicle_id,
                sample.latitude,
                sample.longitude,
                sample.timestamp,
            ),
        )
        .await?;

        if !position_advanced {
            tracing::debug!(
                vehicle_id = %sample.vehicle_id,
                sample_timestamp = %sample.timestamp,
                "Out-of-order sample stored without advancing vehicle state"
            );
        }

        // Fence sweep against the snapshot of active fences at processing time
        let transitions = self.engine.sweep(&sample, vehicle.company_id).await?;

        self.broadcast_sample(&vehicle, &sample, &transitions);
        self.dispatch_side_effects(&vehicle, &sample);

        let updated = store_call(
            self.config.store_write_timeout,
            self.store.get_vehicle(sample.vehicle_id),
        )
        .await?
        .unwrap_or(vehicle);

        tracing::info!(
            vehicle_id = %sample.vehicle_id,
            sample_id = %sample.id,
            latitude = sample.latitude,
            longitude = sample.longitude,
            geofence_events = transitions.len(),
            source = %sample.source,
            "Position recorded"
        );

        Ok(RecordedPosition {
            sample_id: sample.id,
            vehicle_id: sample.vehicle_id,
            position_advanced,
            last_known_latitude: updated.last_known_latitude,
            last_known_longitude: updated.last_known_longitude,
            last_reported_at: updated.last_reported_at,
            geofence_events: transitions.len(),
        })
    }

    /// Newest-first position history for one vehicle.
    pub async fn position_history(
        &self,
        vehicle_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<PositionSample>> {
        store_call(
            self.config.store_write_timeout,
            self.store.get_vehicle(vehicle_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", vehicle_id)))?;

        Ok(store_call(
            self.config.store_query_timeout,
            self.store.position_history(vehicle_id, from, to, limit),
        )
        .await?)
    }

    fn broadcast_sample(
        &self,
        vehicle: &Vehicle,
        sample: &PositionSample,
        transitions: &[FenceTransition],
    ) {
        let location = TrackingEvent::LocationUpdate {
            vehicle_id: sample.vehicle_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            speed: sample.speed,
            heading: sample.heading,
            timestamp: sample.timestamp,
        };
        self.hub
            .publish(&vehicle_group(sample.vehicle_id), location.clone());
        self.hub.publish(&fleet_group(vehicle.company_id), location);

        for transition in transitions {
            let event = TrackingEvent::GeofenceEvent {
                vehicle_id: sample.vehicle_id,
                geofence_id: transition.geofence_id,
                geofence_name: transition.geofence_name.clone(),
                event_type: transition.event,
                visit_id: transition.visit.id,
                timestamp: sample.timestamp,
            };
            self.hub
                .publish(&vehicle_group(sample.vehicle_id), event.clone());
            self.hub.publish(&fleet_group(vehicle.company_id), event);
        }
    }

    /// Fire-and-forget follow-ups. None of these gate the ingestion
    /// response; they retry on their own and are idempotent.
    fn dispatch_side_effects(&self, vehicle: &Vehicle, sample: &PositionSample) {
        let cache = Arc::clone(&self.cache);
        let radius_km = self.config.position_invalidation_radius_km;
        let max_retries = self.config.invalidation_max_retries;
        let (lat, lng) = (sample.latitude, sample.longitude);
        let company_id = vehicle.company_id;
        tokio::spawn(async move {
            let mut attempt = 0;
            loop {
                match cache
                    .invalidate_region(lat, lng, radius_km, Some(company_id))
                    .await
                {
                    Ok(_) => break,
                    Err(e) if attempt < max_retries => {
                        attempt += 1;
                        tracing::debug!(attempt, error = %e, "Region invalidation retry");
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Region invalidation gave up, relying on TTL expiry");
                        break;
                    }
                }
            }
        });

        let engine = Arc::clone(&self.engine);
        let point = sample.point();
        tokio::spawn(async move {
            if let Err(e) = engine.cached_intersections(point, company_id).await {
                tracing::debug!(error = %e, "Async geofence intersection check failed");
            }
        });

        let maintenance = self.maintenance.clone();
        tokio::spawn(async move {
            maintenance.notify_position_write(company_id).await;
        });
    }
}
