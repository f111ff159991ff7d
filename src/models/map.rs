// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map viewport types and GeoJSON feature shaping.

use chrono::{DateTime, Utc};
use geo::{Point, Polygon, Rect};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::time_utils::format_utc_rfc3339;

/// A geographic bounding box for map viewport queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// The viewport as a polygon (x = longitude, y = latitude).
    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            (self.min_lng, self.min_lat),
            (self.max_lng, self.max_lat),
        )
        .to_polygon()
    }

    pub fn center(&self) -> Point<f64> {
        Point::new(
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn contains(&self, point: &Point<f64>) -> bool {
        point.y() >= self.min_lat
            && point.y() <= self.max_lat
            && point.x() >= self.min_lng
            && point.x() <= self.max_lng
    }

    /// Coordinates must be in range and min strictly below max on both axes.
    pub fn is_valid(&self) -> bool {
        self.min_lat < self.max_lat
            && self.min_lng < self.max_lng
            && self.min_lat >= -90.0
            && self.max_lat <= 90.0
            && self.min_lng >= -180.0
            && self.max_lng <= 180.0
    }

    /// Fixed-precision fingerprint used in cache keys. Viewports that
    /// agree to four decimal places share an entry.
    pub fn fingerprint(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}

/// A synthetic grouping of nearby vehicles for low-zoom rendering.
/// Cache-only: regenerated per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleCluster {
    pub cluster_id: u64,
    pub vehicle_count: usize,
    pub center_lat: f64,
    pub center_lng: f64,
    pub vehicle_ids: Vec<Uuid>,
    pub last_update: DateTime<Utc>,
}

impl VehicleCluster {
    pub fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("cluster_id".to_string(), json!(self.cluster_id));
        properties.insert("vehicle_count".to_string(), json!(self.vehicle_count));
        properties.insert("vehicle_ids".to_string(), json!(self.vehicle_ids));
        properties.insert(
            "last_update".to_string(),
            json!(format_utc_rfc3339(self.last_update)),
        );
        properties.insert("cluster_type".to_string(), json!("vehicles"));

        point_feature(self.center_lng, self.center_lat, properties)
    }
}

/// An individual vehicle marker for high-zoom rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualVehicle {
    pub vehicle_id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub registration: String,
    pub status: String,
    pub last_update: DateTime<Utc>,
}

impl IndividualVehicle {
    pub fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("vehicle_id".to_string(), json!(self.vehicle_id));
        properties.insert("registration".to_string(), json!(self.registration));
        properties.insert("status".to_string(), json!(self.status));
        properties.insert(
            "last_update".to_string(),
            json!(format_utc_rfc3339(self.last_update)),
        );
        properties.insert("cluster_type".to_string(), json!("individual"));

        point_feature(self.lng, self.lat, properties)
    }
}

fn point_feature(lng: f64, lat: f64, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![lng, lat]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// How the viewport was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Clustered,
    Individual,
}

/// Wrap map features in a FeatureCollection with response metadata.
pub fn fleet_feature_collection(
    features: Vec<Feature>,
    zoom: u8,
    mode: DisplayMode,
    bounds: &BoundingBox,
    generated_at: DateTime<Utc>,
    cache_ttl_secs: u64,
) -> FeatureCollection {
    let mut foreign = JsonObject::new();
    foreign.insert(
        "metadata".to_string(),
        json!({
            "zoom_level": zoom,
            "display_mode": mode,
            "bounds": bounds,
            "generated_at": format_utc_rfc3339(generated_at),
            "cache_ttl": cache_ttl_secs,
            "feature_count": features.len(),
        }),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign),
    }
}
