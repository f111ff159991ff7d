// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory spatial store.
//!
//! Implements the full [`SpatialStore`] contract without an external
//! database: month-keyed sample partitions, an R-tree over last-known
//! vehicle positions, and recomputable aggregates standing in for the
//! store's materialized views. Backs tests and single-node deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Months, Utc};
use dashmap::DashMap;
use rstar::{RTree, RTreeObject, AABB};
use uuid::Uuid;

use super::{GeofenceStats, SpatialStore, StoreError, StoreResult};
use crate::models::{
    BoundingBox, Geofence, LocationVisit, PositionSample, Vehicle, VehicleCluster, VisitFilter,
};

/// R-tree entry for a vehicle's last-known position.
#[derive(Debug, Clone, PartialEq)]
struct VehiclePoint {
    vehicle_id: Uuid,
    position: [f64; 2], // [lng, lat]
}

impl RTreeObject for VehiclePoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// Fleet summary aggregate: per-company extents plus the overall extent.
#[derive(Debug, Clone, Default)]
struct FleetSummary {
    company_extents: HashMap<Uuid, BoundingBox>,
    overall_extent: Option<BoundingBox>,
    computed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryStore {
    /// Position samples, partitioned by "YYYY-MM" of the sample timestamp.
    partitions: DashMap<String, Vec<PositionSample>>,
    vehicles: DashMap<Uuid, Vehicle>,
    geofences: DashMap<Uuid, Geofence>,
    visits: DashMap<Uuid, LocationVisit>,
    /// Spatial index over last-known vehicle positions.
    index: RwLock<RTree<VehiclePoint>>,
    fleet_summary: RwLock<FleetSummary>,
    geofence_stats: RwLock<HashMap<Uuid, GeofenceStats>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn box_string(bounds: &BoundingBox) -> String {
        format!(
            "BOX({} {},{} {})",
            bounds.min_lng, bounds.min_lat, bounds.max_lng, bounds.max_lat
        )
    }

    fn extent_of(vehicles: impl Iterator<Item = (f64, f64)>) -> Option<BoundingBox> {
        let mut extent: Option<BoundingBox> = None;
        for (lng, lat) in vehicles {
            extent = Some(match extent {
                None => BoundingBox::new(lat, lng, lat, lng),
                Some(e) => BoundingBox::new(
                    e.min_lat.min(lat),
                    e.min_lng.min(lng),
                    e.max_lat.max(lat),
                    e.max_lng.max(lng),
                ),
            });
        }
        extent
    }

    fn reindex_vehicle(&self, vehicle_id: Uuid, old: Option<[f64; 2]>, new: [f64; 2]) {
        let mut index = self.index.write().expect("index lock poisoned");
        if let Some(position) = old {
            index.remove(&VehiclePoint {
                vehicle_id,
                position,
            });
        }
        index.insert(VehiclePoint {
            vehicle_id,
            position: new,
        });
    }

    fn stats_for(&self, geofence_id: Uuid, now: DateTime<Utc>) -> GeofenceStats {
        let mut total = 0;
        let mut active = 0;
        let mut durations = Vec::new();
        for visit in self.visits.iter() {
            if visit.geofence_id != geofence_id {
                continue;
            }
            total += 1;
            if visit.is_active() {
                active += 1;
            }
            if let Some(hours) = visit.duration_hours() {
                durations.push(hours);
            }
        }

        let avg_duration_hours = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<f64>() / durations.len() as f64)
        };

        GeofenceStats {
            geofence_id,
            total_visits: total,
            active_visits: active,
            avg_duration_hours,
            computed_at: now,
        }
    }
}

#[async_trait]
impl SpatialStore for MemoryStore {
    async fn insert_position(&self, sample: &PositionSample) -> StoreResult<()> {
        self.partitions
            .entry(sample.partition_key())
            .or_default()
            .push(sample.clone());
        Ok(())
    }

    async fn position_history(
        &self,
        vehicle_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> StoreResult<Vec<PositionSample>> {
        let mut samples: Vec<PositionSample> = self
            .partitions
            .iter()
            .flat_map(|partition| {
                partition
                    .value()
                    .iter()
                    .filter(|s| s.vehicle_id == vehicle_id)
                    .filter(|s| from.is_none_or(|f| s.timestamp >= f))
                    .filter(|s| to.is_none_or(|t| s.timestamp <= t))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        samples.truncate(limit);
        Ok(samples)
    }

    async fn get_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>> {
        Ok(self.vehicles.get(&id).map(|v| v.value().clone()))
    }

    async fn upsert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        let old = self
            .vehicles
            .get(&vehicle.id)
            .and_then(|v| v.last_known_point())
            .map(|p| [p.x(), p.y()]);
        if let (Some(lng), Some(lat)) = (vehicle.last_known_longitude, vehicle.last_known_latitude)
        {
            self.reindex_vehicle(vehicle.id, old, [lng, lat]);
        }
        self.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn vehicles(&self, company_id: Option<Uuid>) -> StoreResult<Vec<Vehicle>> {
        Ok(self
            .vehicles
            .iter()
            .filter(|v| company_id.is_none_or(|c| v.company_id == c))
            .map(|v| v.value().clone())
            .collect())
    }

    async fn advance_vehicle_position(
        &self,
        vehicle_id: Uuid,
        latitude: f64,
        longitude: f64,
        reported_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut entry = self
            .vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| StoreError(format!("vehicle {} not found", vehicle_id)))?;

        if !entry.accepts_report_at(reported_at) {
            return Ok(false);
        }

        let old_position = entry.last_known_point().map(|p| [p.x(), p.y()]);
        entry.last_known_latitude = Some(latitude);
        entry.last_known_longitude = Some(longitude);
        entry.last_reported_at = Some(reported_at);

        // Reindex inside the per-vehicle critical section: concurrent
        // samples for one vehicle must not leave duplicate index entries.
        // Lock order is always vehicles entry -> index.
        self.reindex_vehicle(vehicle_id, old_position, [longitude, latitude]);
        Ok(true)
    }

    async fn vehicles_in_bounds(
        &self,
        bounds: &BoundingBox,
        company_id: Option<Uuid>,
        reported_after: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Vehicle>> {
        let candidate_ids: Vec<Uuid> = {
            let index = self.index.read().expect("index lock poisoned");
            let envelope = AABB::from_corners(
                [bounds.min_lng, bounds.min_lat],
                [bounds.max_lng, bounds.max_lat],
            );
            index
                .locate_in_envelope(&envelope)
                .map(|entry| entry.vehicle_id)
                .collect()
        };

        let mut matches: Vec<Vehicle> = candidate_ids
            .into_iter()
            .filter_map(|id| self.vehicles.get(&id).map(|v| v.value().clone()))
            .filter(|v| company_id.is_none_or(|c| v.company_id == c))
            .filter(|v| v.last_reported_at.is_some_and(|t| t >= reported_after))
            .collect();

        // Deterministic order before the silent cap
        matches.sort_by(|a, b| {
            b.last_reported_at
                .cmp(&a.last_reported_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn clustered_vehicles(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        company_id: Option<Uuid>,
    ) -> StoreResult<Vec<VehicleCluster>> {
        // Grid resolution scales with zoom so a viewport yields a bounded
        // number of clusters however dense the fleet is.
        let grid_dim = (usize::from(zoom) / 2).clamp(1, 16);
        let cell_width = (bounds.max_lng - bounds.min_lng) / grid_dim as f64;
        let cell_height = (bounds.max_lat - bounds.min_lat) / grid_dim as f64;

        let in_view = self
            .vehicles_in_bounds(bounds, company_id, DateTime::<Utc>::MIN_UTC, usize::MAX)
            .await?;

        let mut cells: HashMap<u64, Vec<Vehicle>> = HashMap::new();
        for vehicle in in_view {
            let Some(point) = vehicle.last_known_point() else {
                continue;
            };
            let col = (((point.x() - bounds.min_lng) / cell_width) as usize).min(grid_dim - 1);
            let row = (((point.y() - bounds.min_lat) / cell_height) as usize).min(grid_dim - 1);
            let cell_id = (row * grid_dim + col) as u64;
            cells.entry(cell_id).or_default().push(vehicle);
        }

        let mut clusters: Vec<VehicleCluster> = cells
            .into_iter()
            .map(|(cell_id, members)| {
                let count = members.len();
                let (mut lat_sum, mut lng_sum) = (0.0, 0.0);
                let mut last_update = DateTime::<Utc>::MIN_UTC;
                let mut vehicle_ids = Vec::with_capacity(count);
                for member in &members {
                    let point = member.last_known_point().expect("member has a position");
                    lng_sum += point.x();
                    lat_sum += point.y();
                    if let Some(reported) = member.last_reported_at {
                        last_update = last_update.max(reported);
                    }
                    vehicle_ids.push(member.id);
                }
                VehicleCluster {
                    cluster_id: cell_id,
                    vehicle_count: count,
                    center_lat: lat_sum / count as f64,
                    center_lng: lng_sum / count as f64,
                    vehicle_ids,
                    last_update,
                }
            })
            .collect();

        clusters.sort_by_key(|c| c.cluster_id);
        Ok(clusters)
    }

    async fn fleet_extent(&self, company_id: Option<Uuid>) -> StoreResult<Option<String>> {
        let summary = self.fleet_summary.read().expect("summary lock poisoned");
        let extent = match company_id {
            Some(company) => summary.company_extents.get(&company).copied(),
            None => summary.overall_extent,
        };
        Ok(extent.map(|e| Self::box_string(&e)))
    }

    async fn upsert_geofence(&self, geofence: &Geofence) -> StoreResult<()> {
        self.geofences.insert(geofence.id, geofence.clone());
        Ok(())
    }

    async fn get_geofence(&self, id: Uuid) -> StoreResult<Option<Geofence>> {
        Ok(self.geofences.get(&id).map(|g| g.value().clone()))
    }

    async fn active_geofences(&self, company_id: Option<Uuid>) -> StoreResult<Vec<Geofence>> {
        Ok(self
            .geofences
            .iter()
            .filter(|g| g.is_active)
            .filter(|g| company_id.is_none_or(|c| g.company_id == c))
            .map(|g| g.value().clone())
            .collect())
    }

    async fn find_active_visit(
        &self,
        vehicle_id: Uuid,
        geofence_id: Uuid,
    ) -> StoreResult<Option<LocationVisit>> {
        Ok(self
            .visits
            .iter()
            .find(|v| v.vehicle_id == vehicle_id && v.geofence_id == geofence_id && v.is_active())
            .map(|v| v.value().clone()))
    }

    async fn insert_visit(&self, visit: &LocationVisit) -> StoreResult<()> {
        self.visits.insert(visit.id, visit.clone());
        Ok(())
    }

    async fn update_visit(&self, visit: &LocationVisit) -> StoreResult<()> {
        if !self.visits.contains_key(&visit.id) {
            return Err(StoreError(format!("visit {} not found", visit.id)));
        }
        self.visits.insert(visit.id, visit.clone());
        Ok(())
    }

    async fn visits(&self, filter: &VisitFilter) -> StoreResult<Vec<LocationVisit>> {
        let mut matches: Vec<LocationVisit> = self
            .visits
            .iter()
            .filter(|v| filter.matches(v))
            .map(|v| v.value().clone())
            .collect();
        matches.sort_by(|a, b| b.entry_time.cmp(&a.entry_time));
        Ok(matches)
    }

    async fn fleet_summary_computed_at(&self) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .fleet_summary
            .read()
            .expect("summary lock poisoned")
            .computed_at)
    }

    async fn refresh_spatial_views(&self) -> StoreResult<()> {
        self.refresh_fleet_summary(None).await?;
        self.refresh_geofence_stats(None).await?;
        Ok(())
    }

    async fn refresh_fleet_summary(&self, company_id: Option<Uuid>) -> StoreResult<()> {
        let now = Utc::now();
        let positioned: Vec<(Uuid, f64, f64)> = self
            .vehicles
            .iter()
            .filter_map(|v| {
                v.last_known_point()
                    .map(|p| (v.company_id, p.x(), p.y()))
            })
            .collect();

        let mut summary = self.fleet_summary.write().expect("summary lock poisoned");
        match company_id {
            Some(company) => {
                let extent = Self::extent_of(
                    positioned
                        .iter()
                        .filter(|(c, _, _)| *c == company)
                        .map(|(_, lng, lat)| (*lng, *lat)),
                );
                match extent {
                    Some(e) => {
                        summary.company_extents.insert(company, e);
                    }
                    None => {
                        summary.company_extents.remove(&company);
                    }
                }
            }
            None => {
                let mut by_company: HashMap<Uuid, Vec<(f64, f64)>> = HashMap::new();
                for (company, lng, lat) in &positioned {
                    by_company.entry(*company).or_default().push((*lng, *lat));
                }
                summary.company_extents = by_company
                    .into_iter()
                    .filter_map(|(company, points)| {
                        Self::extent_of(points.into_iter()).map(|e| (company, e))
                    })
                    .collect();
            }
        }
        summary.overall_extent =
            Self::extent_of(positioned.iter().map(|(_, lng, lat)| (*lng, *lat)));
        summary.computed_at = Some(now);
        Ok(())
    }

    async fn refresh_geofence_stats(&self, geofence_id: Option<Uuid>) -> StoreResult<()> {
        let now = Utc::now();
        let targets: Vec<Uuid> = match geofence_id {
            Some(id) => vec![id],
            None => self.geofences.iter().map(|g| g.id).collect(),
        };

        let computed: Vec<GeofenceStats> =
            targets.into_iter().map(|id| self.stats_for(id, now)).collect();

        let mut stats = self.geofence_stats.write().expect("stats lock poisoned");
        for entry in computed {
            stats.insert(entry.geofence_id, entry);
        }
        Ok(())
    }

    async fn geofence_stats(&self, geofence_id: Uuid) -> StoreResult<Option<GeofenceStats>> {
        Ok(self
            .geofence_stats
            .read()
            .expect("stats lock poisoned")
            .get(&geofence_id)
            .cloned())
    }

    async fn maintain_indexes(&self) -> StoreResult<()> {
        // Rebuild the R-tree from scratch: the bulk-loaded tree is better
        // balanced than one grown by incremental inserts.
        let entries: Vec<VehiclePoint> = self
            .vehicles
            .iter()
            .filter_map(|v| {
                v.last_known_point().map(|p| VehiclePoint {
                    vehicle_id: v.id,
                    position: [p.x(), p.y()],
                })
            })
            .collect();

        let rebuilt = RTree::bulk_load(entries);
        *self.index.write().expect("index lock poisoned") = rebuilt;
        Ok(())
    }

    async fn maintain_partitions(&self, retention_months: u32) -> StoreResult<usize> {
        let cutoff = Utc::now()
            .checked_sub_months(Months::new(retention_months))
            .ok_or_else(|| StoreError("retention horizon out of range".to_string()))?;
        let cutoff_key = format!("{:04}-{:02}", cutoff.year(), cutoff.month());

        let expired: Vec<String> = self
            .partitions
            .iter()
            .map(|p| p.key().clone())
            .filter(|key| key < &cutoff_key)
            .collect();

        let dropped = expired.len();
        for key in expired {
            self.partitions.remove(&key);
        }
        if dropped > 0 {
            tracing::info!(dropped, "Dropped expired position partitions");
        }
        Ok(dropped)
    }
}
