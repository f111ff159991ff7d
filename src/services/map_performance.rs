// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map performance service.
//!
//! Serves viewport queries to many concurrent dashboard clients without
//! overwhelming the spatial store: cluster rendering below the zoom
//! threshold, capped individual markers above it, and the geo-cache in
//! front of everything.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::map::fleet_feature_collection;
use crate::models::{BoundingBox, DisplayMode, IndividualVehicle, VisitFilter, VisitStatus};
use crate::services::geocache::GeoCache;
use crate::services::store_call;
use crate::store::SpatialStore;
use crate::time_utils::format_utc_rfc3339;

/// Dashboard summary for a company's fleet.
#[derive(Debug, Serialize)]
pub struct FleetOverview {
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    pub inactive_vehicles: usize,
    pub current_visits: usize,
    pub last_updated: String,
}

pub struct MapPerformanceService {
    store: Arc<dyn SpatialStore>,
    cache: Arc<GeoCache>,
    config: Arc<Config>,
}

impl MapPerformanceService {
    pub fn new(store: Arc<dyn SpatialStore>, cache: Arc<GeoCache>, config: Arc<Config>) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Fleet data for a viewport, shaped by zoom level. Cached payloads
    /// are returned unchanged; a cache miss queries the store and
    /// populates the cache with a mode-dependent TTL.
    pub async fn get_fleet_view(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        company_id: Option<Uuid>,
    ) -> Result<serde_json::Value> {
        if !bounds.is_valid() {
            return Err(AppError::Validation(
                "bounds must satisfy min < max within [-90,90]/[-180,180]".to_string(),
            ));
        }

        if let Some(cached) = self.cache.get_map(bounds, zoom, company_id).await {
            tracing::debug!(zoom, "Map cache hit");
            return Ok(cached);
        }

        let clustered = zoom < self.config.cluster_zoom_threshold;
        let (features, mode, ttl) = if clustered {
            (
                self.clustered_features(bounds, zoom, company_id).await?,
                DisplayMode::Clustered,
                self.config.cluster_cache_ttl,
            )
        } else {
            (
                self.individual_features(bounds, company_id).await?,
                DisplayMode::Individual,
                self.config.individual_cache_ttl,
            )
        };

        let feature_count = features.len();
        let collection =
            fleet_feature_collection(features, zoom, mode, bounds, Utc::now(), ttl.as_secs());
        let payload = serde_json::to_value(&collection)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Feature encoding failed: {}", e)))?;

        self.cache
            .set_map(bounds, zoom, company_id, &payload, ttl)
            .await;
        tracing::info!(zoom, ?mode, feature_count, "Generated and cached map data");

        Ok(payload)
    }

    async fn clustered_features(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        company_id: Option<Uuid>,
    ) -> Result<Vec<geojson::Feature>> {
        let clusters = store_call(
            self.config.store_query_timeout,
            self.store.clustered_vehicles(bounds, zoom, company_id),
        )
        .await?;
        Ok(clusters.iter().map(|c| c.to_feature()).collect())
    }

    async fn individual_features(
        &self,
        bounds: &BoundingBox,
        company_id: Option<Uuid>,
    ) -> Result<Vec<geojson::Feature>> {
        let freshness = ChronoDuration::from_std(self.config.freshness_window)
            .unwrap_or_else(|_| ChronoDuration::hours(2));
        let reported_after = Utc::now() - freshness;

        let vehicles = store_call(
            self.config.store_query_timeout,
            self.store.vehicles_in_bounds(
                bounds,
                company_id,
                reported_after,
                self.config.max_individual_vehicles,
            ),
        )
        .await?;

        Ok(vehicles
            .iter()
            .filter_map(|vehicle| {
                let point = vehicle.last_known_point()?;
                let last_update = vehicle.last_reported_at?;
                Some(
                    IndividualVehicle {
                        vehicle_id: vehicle.id,
                        lat: point.y(),
                        lng: point.x(),
                        registration: vehicle.registration.clone(),
                        status: vehicle.status.clone(),
                        last_update,
                    }
                    .to_feature(),
                )
            })
            .collect())
    }

    /// Bounding box of the fleet's last-known locations, parsed from the
    /// store's precomputed extent aggregate. None when the scope has no
    /// positioned vehicles (or the aggregate has not been computed yet).
    pub async fn get_fleet_bounds(&self, company_id: Option<Uuid>) -> Result<Option<BoundingBox>> {
        if let Some(cached) = self.cache.get_bounds(company_id).await {
            return Ok(Some(cached));
        }

        let extent = store_call(
            self.config.store_query_timeout,
            self.store.fleet_extent(company_id),
        )
        .await?;

        let Some(bounds) = extent.as_deref().and_then(parse_box_extent) else {
            return Ok(None);
        };

        self.cache
            .set_bounds(company_id, &bounds, self.config.bounds_cache_ttl)
            .await;
        Ok(Some(bounds))
    }

    /// Fleet summary for dashboards: vehicle activity plus live visits.
    pub async fn fleet_overview(&self, company_id: Option<Uuid>) -> Result<FleetOverview> {
        let vehicles = store_call(
            self.config.store_query_timeout,
            self.store.vehicles(company_id),
        )
        .await?;

        let activity_window = ChronoDuration::from_std(self.config.overview_activity_window)
            .unwrap_or_else(|_| ChronoDuration::minutes(30));
        let active_cutoff = Utc::now() - activity_window;

        let total_vehicles = vehicles.len();
        let active_vehicles = vehicles
            .iter()
            .filter(|v| v.last_reported_at.is_some_and(|t| t >= active_cutoff))
            .count();

        let vehicle_ids: std::collections::HashSet<Uuid> =
            vehicles.iter().map(|v| v.id).collect();
        let active_visits = store_call(
            self.config.store_query_timeout,
            self.store.visits(&VisitFilter {
                status: Some(VisitStatus::Active),
                ..Default::default()
            }),
        )
        .await?;
        let current_visits = active_visits
            .iter()
            .filter(|v| vehicle_ids.contains(&v.vehicle_id))
            .count();

        Ok(FleetOverview {
            total_vehicles,
            active_vehicles,
            inactive_vehicles: total_vehicles - active_vehicles,
            current_visits,
            last_updated: format_utc_rfc3339(Utc::now()),
        })
    }
}

/// Parse the store's `BOX(min_lng min_lat,max_lng max_lat)` extent format.
/// Malformed extents yield None rather than an error.
fn parse_box_extent(raw: &str) -> Option<BoundingBox> {
    let inner = raw.strip_prefix("BOX(")?.strip_suffix(')')?;
    let coords: Vec<f64> = inner
        .replace(',', " ")
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if coords.len() != 4 {
        return None;
    }
    Some(BoundingBox::new(coords[1], coords[0], coords[3], coords[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_box_extent() {
        let bounds = parse_box_extent("BOX(150.5 -34.2,151.3 -33.1)").unwrap();
        assert_eq!(bounds.min_lng, 150.5);
        assert_eq!(bounds.min_lat, -34.2);
        assert_eq!(bounds.max_lng, 151.3);
        assert_eq!(bounds.max_lat, -33.1);
    }

    #[test]
    fn malformed_extents_yield_none() {
        assert!(parse_box_extent("").is_none());
        assert!(parse_box_extent("BOX()").is_none());
        assert!(parse_box_extent("BOX(1 2,3)").is_none());
        assert!(parse_box_extent("not a box").is_none());
        assert!(parse_box_extent("BOX(a b,c d)").is_none());
    }
}
