// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence engine: containment sweep and visit lifecycle.
//!
//! Every incoming sample is tested against the snapshot of active fences
//! in its company scope. Containment checks for one sample run
//! concurrently across fences; the open/close mutation for a given
//! (vehicle, geofence) pair is serialized through a per-pair lock so
//! out-of-order samples for the same vehicle cannot create a second
//! ACTIVE visit.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use geo::Point;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::models::{Geofence, LocationVisit, PositionSample};
use crate::services::broadcast::GeofenceEventType;
use crate::services::demurrage::compute_demurrage;
use crate::services::geocache::GeoCache;
use crate::services::maintenance::MaintenanceScheduler;
use crate::services::store_call;
use crate::store::SpatialStore;

/// Fence checks evaluated concurrently per sample.
const MAX_CONCURRENT_FENCE_CHECKS: usize = 8;

/// A visit opened or closed by a sample.
#[derive(Debug, Clone)]
pub struct FenceTransition {
    pub geofence_id: Uuid,
    pub geofence_name: String,
    pub event: GeofenceEventType,
    pub visit: LocationVisit,
}

type VisitLocks = DashMap<(Uuid, Uuid), Arc<Mutex<()>>>;

pub struct GeofenceEngine {
    store: Arc<dyn SpatialStore>,
    cache: Arc<GeoCache>,
    maintenance: MaintenanceScheduler,
    config: Arc<Config>,
    visit_locks: VisitLocks,
}

impl GeofenceEngine {
    pub fn new(
        store: Arc<dyn SpatialStore>,
        cache: Arc<GeoCache>,
        maintenance: MaintenanceScheduler,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            cache,
            maintenance,
            config,
            visit_locks: DashMap::new(),
        }
    }

    /// Persist a geofence change and run its consistency side effects:
    /// invalidate cached map tiles covering the fence (wider radius than a
    /// position write) and schedule a statistics refresh.
    pub async fn apply_geofence_change(&self, fence: &Geofence) -> Result<()> {
        store_call(
            self.config.store_write_timeout,
            self.store.upsert_geofence(fence),
        )
        .await?;

        let anchor = fence.anchor_point();
        if let Err(e) = self
            .cache
            .invalidate_region(
                anchor.y(),
                anchor.x(),
                self.config.geofence_invalidation_radius_km,
                Some(fence.company_id),
            )
            .await
        {
            tracing::warn!(
                geofence_id = %fence.id,
                error = %e,
                "Geofence cache invalidation incomplete, entries will expire by TTL"
            );
        }

        self.maintenance.notify_geofence_change(fence.id).await;
        tracing::info!(
            geofence_id = %fence.id,
            name = %fence.name,
            active = fence.is_active,
            "Geofence updated"
        );
        Ok(())
    }

    /// Run the fence sweep for a persisted sample. Returns the visit
    /// transitions the sample caused. A failing check for one fence is
    /// logged and skipped; the asynchronous intersection follow-up will
    /// see the vehicle again.
    pub async fn sweep(&self, sample: &PositionSample, company_id: Uuid) -> Result<Vec<FenceTransition>> {
        let fences = store_call(
            self.config.store_query_timeout,
            self.store.active_geofences(Some(company_id)),
        )
        .await?;

        let transitions: Vec<FenceTransition> = stream::iter(fences)
            .map(|fence| async move {
                match self.apply_fence(sample, &fence).await {
                    Ok(transition) => transition,
                    Err(e) => {
                        tracing::warn!(
                            geofence_id = %fence.id,
                            sample_id = %sample.id,
                            error = %e,
                            "Fence check failed for sample, skipping"
                        );
                        None
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_FENCE_CHECKS)
            .filter_map(|t| async move { t })
            .collect()
            .await;

        Ok(transitions)
    }

    /// Evaluate one fence against one sample under the pair lock.
    async fn apply_fence(
        &self,
        sample: &PositionSample,
        fence: &Geofence,
    ) -> Result<Option<FenceTransition>> {
        let present = fence.is_presence(&sample.point());

        let lock = self
            .visit_locks
            .entry((sample.vehicle_id, fence.id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let active = store_call(
            self.config.store_write_timeout,
            self.store.find_active_visit(sample.vehicle_id, fence.id),
        )
        .await?;

        match (present, active) {
            (true, None) => {
                // New entry
                let visit = LocationVisit::open(
                    fence.id,
                    sample.vehicle_id,
                    sample.shipment_id,
                    sample.timestamp,
                    sample.id,
                );
                store_call(
                    self.config.store_write_timeout,
                    self.store.insert_visit(&visit),
                )
                .await?;
                tracing::info!(
                    vehicle_id = %sample.vehicle_id,
                    geofence = %fence.name,
                    entry_time = %sample.timestamp,
                    "Vehicle entered geofence"
                );
                Ok(Some(FenceTransition {
                    geofence_id: fence.id,
                    geofence_name: fence.name.clone(),
                    event: GeofenceEventType::Entered,
                    visit,
                }))
            }
            (false, Some(mut visit)) => {
                // Exit
                visit.close(sample.timestamp, sample.id);
                if let Some(demurrage) = compute_demurrage(&visit, fence) {
                    visit.demurrage_hours = Some(demurrage.chargeable_hours);
                    visit.demurrage_charge = demurrage.charge;
                }
                store_call(
                    self.config.store_write_timeout,
                    self.store.update_visit(&visit),
                )
                .await?;
                tracing::info!(
                    vehicle_id = %sample.vehicle_id,
                    geofence = %fence.name,
                    exit_time = %sample.timestamp,
                    demurrage_hours = ?visit.demurrage_hours,
                    "Vehicle exited geofence"
                );
                Ok(Some(FenceTransition {
                    geofence_id: fence.id,
                    geofence_name: fence.name.clone(),
                    event: GeofenceEventType::Exited,
                    visit,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Point-level intersection check with a short-TTL cache, used by the
    /// asynchronous follow-up after ingestion. Raw containment, without
    /// the fence policy applied.
    pub async fn cached_intersections(
        &self,
        point: Point<f64>,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        if let Some(cached) = self
            .cache
            .get_intersections(company_id, point.y(), point.x())
            .await
        {
            return Ok(cached);
        }

        let fences = store_call(
            self.config.store_query_timeout,
            self.store.active_geofences(Some(company_id)),
        )
        .await?;

        let intersecting: Vec<Uuid> = fences
            .iter()
            .filter(|f| f.boundary.contains(&point))
            .map(|f| f.id)
            .collect();

        self.cache
            .set_intersections(
                company_id,
                point.y(),
                point.x(),
                &intersecting,
                self.config.intersection_cache_ttl,
            )
            .await;

        Ok(intersecting)
    }
}
