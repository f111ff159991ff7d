// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spatial store query contract.
//!
//! The spatial store (geometry columns, spatial indexes, materialized
//! aggregates) is an external dependency. This module defines the slice of
//! its surface this subsystem relies on, plus an in-memory implementation
//! backing tests and local runs.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    BoundingBox, Geofence, LocationVisit, PositionSample, Vehicle, VehicleCluster, VisitFilter,
};

pub use memory::MemoryStore;

/// Store-level failure. Everything the store can do wrong is, from this
/// subsystem's point of view, a retryable unavailability.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StoreUnavailable(err.0)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Precomputed per-geofence statistics (a materialized aggregate).
#[derive(Debug, Clone)]
pub struct GeofenceStats {
    pub geofence_id: Uuid,
    pub total_visits: usize,
    pub active_visits: usize,
    pub avg_duration_hours: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

/// The query contract against the spatial store.
#[async_trait]
pub trait SpatialStore: Send + Sync {
    // ─── Position samples ────────────────────────────────────────
    async fn insert_position(&self, sample: &PositionSample) -> StoreResult<()>;

    /// Newest-first history for a vehicle, bounded by an optional window.
    async fn position_history(
        &self,
        vehicle_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> StoreResult<Vec<PositionSample>>;

    // ─── Vehicles ────────────────────────────────────────────────
    async fn get_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>>;

    async fn upsert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()>;

    async fn vehicles(&self, company_id: Option<Uuid>) -> StoreResult<Vec<Vehicle>>;

    /// Conditionally advance a vehicle's last-known state. Returns whether
    /// the update was applied (false when `reported_at` is not newer than
    /// the stored `last_reported_at` — last-writer-wins by sample time).
    async fn advance_vehicle_position(
        &self,
        vehicle_id: Uuid,
        latitude: f64,
        longitude: f64,
        reported_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Vehicles whose last-known location intersects the viewport and whose
    /// last report is at or after `reported_after`, capped at `limit`.
    async fn vehicles_in_bounds(
        &self,
        bounds: &BoundingBox,
        company_id: Option<Uuid>,
        reported_after: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Vehicle>>;

    /// The store's clustering function: group vehicles in the viewport
    /// into zoom-scaled grid cells.
    async fn clustered_vehicles(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        company_id: Option<Uuid>,
    ) -> StoreResult<Vec<VehicleCluster>>;

    /// Fleet extent from the precomputed summary aggregate, in the store's
    /// `BOX(min_lng min_lat,max_lng max_lat)` text format. None when the
    /// aggregate has no rows for the scope.
    async fn fleet_extent(&self, company_id: Option<Uuid>) -> StoreResult<Option<String>>;

    // ─── Geofences ───────────────────────────────────────────────
    async fn upsert_geofence(&self, geofence: &Geofence) -> StoreResult<()>;

    async fn get_geofence(&self, id: Uuid) -> StoreResult<Option<Geofence>>;

    /// Active geofences in scope: company-owned plus global fences when a
    /// company is given, all active fences otherwise.
    async fn active_geofences(&self, company_id: Option<Uuid>) -> StoreResult<Vec<Geofence>>;

    // ─── Visits ──────────────────────────────────────────────────
    async fn find_active_visit(
        &self,
        vehicle_id: Uuid,
        geofence_id: Uuid,
    ) -> StoreResult<Option<LocationVisit>>;

    async fn insert_visit(&self, visit: &LocationVisit) -> StoreResult<()>;

    async fn update_visit(&self, visit: &LocationVisit) -> StoreResult<()>;

    async fn visits(&self, filter: &VisitFilter) -> StoreResult<Vec<LocationVisit>>;

    // ─── Materialized aggregates & maintenance ───────────────────
    /// When the fleet summary aggregate was last recomputed.
    async fn fleet_summary_computed_at(&self) -> StoreResult<Option<DateTime<Utc>>>;

    /// Recompute every spatial aggregate (non-blocking for readers).
    async fn refresh_spatial_views(&self) -> StoreResult<()>;

    /// Recompute the fleet summary, optionally scoped to one company.
    async fn refresh_fleet_summary(&self, company_id: Option<Uuid>) -> StoreResult<()>;

    /// Recompute geofence visit statistics, optionally for one fence.
    async fn refresh_geofence_stats(&self, geofence_id: Option<Uuid>) -> StoreResult<()>;

    async fn geofence_stats(&self, geofence_id: Uuid) -> StoreResult<Option<GeofenceStats>>;

    /// Periodic spatial index upkeep.
    async fn maintain_indexes(&self) -> StoreResult<()>;

    /// Drop position partitions older than the retention horizon.
    /// Returns the number of partitions dropped.
    async fn maintain_partitions(&self, retention_months: u32) -> StoreResult<usize>;
}
