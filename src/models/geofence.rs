// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geofence model and boundary geometry handling.

use geo::{Contains, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named polygonal area with optional demurrage billing rules.
#[derive(Debug, Clone)]
pub struct Geofence {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Geofence name (e.g., "Port Botany Terminal 3")
    pub name: String,
    /// Location category: "WAREHOUSE", "DEPOT", "PORT", ...
    pub location_type: String,
    /// Boundary geometry (can be Polygon or MultiPolygon)
    pub boundary: FenceBoundary,
    /// How containment maps to visit events.
    pub policy: FencePolicy,
    pub demurrage_enabled: bool,
    /// Free hours before demurrage charges apply.
    pub free_time_hours: f64,
    /// Hourly demurrage rate in the default currency.
    pub demurrage_rate_per_hour: Option<f64>,
    pub is_active: bool,
}

/// Whether entering the polygon opens a visit (the normal case) or
/// leaving it does (forbidden-area fences, where presence outside the
/// allowed zone is the billable/alertable condition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FencePolicy {
    Inclusion,
    Exclusion,
}

/// Boundary geometry - either a simple polygon or multi-polygon.
#[derive(Debug, Clone)]
pub enum FenceBoundary {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl FenceBoundary {
    /// Check if a point falls inside this geometry.
    pub fn contains(&self, point: &Point<f64>) -> bool {
        match self {
            FenceBoundary::Polygon(p) => p.contains(point),
            FenceBoundary::MultiPolygon(mp) => mp.contains(point),
        }
    }

    /// Parse a GeoJSON geometry into a boundary.
    pub fn from_geojson(value: geojson::Value) -> Result<Self, BoundaryError> {
        use std::convert::TryInto;

        // Try as Polygon first
        let poly_result: Result<Polygon<f64>, _> = value.clone().try_into();
        if let Ok(poly) = poly_result {
            return Ok(FenceBoundary::Polygon(poly));
        }

        // Try as MultiPolygon
        let multi_result: Result<MultiPolygon<f64>, _> = value.try_into();
        if let Ok(multi) = multi_result {
            return Ok(FenceBoundary::MultiPolygon(multi));
        }

        Err(BoundaryError::UnsupportedGeometry)
    }

    /// Parse a GeoJSON geometry object from raw JSON text.
    pub fn from_geojson_str(raw: &str) -> Result<Self, BoundaryError> {
        let geometry: geojson::Geometry = raw
            .parse::<geojson::GeoJson>()
            .map_err(|e| BoundaryError::ParseError(e.to_string()))?
            .try_into()
            .map_err(|e: geojson::Error| BoundaryError::ParseError(e.to_string()))?;
        Self::from_geojson(geometry.value)
    }
}

/// Errors from boundary parsing.
#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Unsupported geometry type (expected Polygon or MultiPolygon)")]
    UnsupportedGeometry,
}

impl Geofence {
    /// Whether a point at this location counts as "present" for visit
    /// purposes, with the fence's policy applied.
    pub fn is_presence(&self, point: &Point<f64>) -> bool {
        let inside = self.boundary.contains(point);
        match self.policy {
            FencePolicy::Inclusion => inside,
            FencePolicy::Exclusion => !inside,
        }
    }

    /// Representative point for cache invalidation when the fence is edited.
    pub fn anchor_point(&self) -> Point<f64> {
        use geo::Centroid;
        match &self.boundary {
            FenceBoundary::Polygon(p) => p.centroid().unwrap_or_else(|| Point::new(0.0, 0.0)),
            FenceBoundary::MultiPolygon(mp) => {
                mp.centroid().unwrap_or_else(|| Point::new(0.0, 0.0))
            }
        }
    }
}
