// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GPS position sample model and ingestion payload.

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A single GPS position sample. Append-only: once written it is never
/// updated, only dropped wholesale by partition retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSample {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    /// Shipment the vehicle was carrying when the sample was taken, if any.
    pub shipment_id: Option<Uuid>,
    /// Speed in km/h.
    pub speed: Option<f64>,
    /// Heading in degrees from north.
    pub heading: Option<f64>,
    /// GPS accuracy in meters.
    pub accuracy: Option<f64>,
    /// Device battery percentage.
    pub battery_level: Option<f64>,
    /// Signal strength indicator.
    pub signal_strength: Option<f64>,
    /// When the device recorded the sample (not when we received it).
    pub timestamp: DateTime<Utc>,
    /// Where the sample came from: "GPS_DEVICE", "MOBILE_APP", ...
    pub source: String,
}

impl PositionSample {
    /// The sample's location as a geometry point (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Partition key for time-partitioned storage ("YYYY-MM").
    pub fn partition_key(&self) -> String {
        self.timestamp.format("%Y-%m").to_string()
    }
}

/// Ingestion payload for `POST /api/positions`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordPositionRequest {
    pub vehicle_id: Uuid,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be within [-90, 90]"))]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be within [-180, 180]"
    ))]
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub shipment_id: Option<Uuid>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub battery_level: Option<f64>,
    pub signal_strength: Option<f64>,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "GPS_DEVICE".to_string()
}

impl RecordPositionRequest {
    /// Build the sample this request describes, assigning a fresh id.
    pub fn into_sample(self) -> PositionSample {
        PositionSample {
            id: Uuid::new_v4(),
            vehicle_id: self.vehicle_id,
            latitude: self.latitude,
            longitude: self.longitude,
            shipment_id: self.shipment_id,
            speed: self.speed,
            heading: self.heading,
            accuracy: self.accuracy,
            battery_level: self.battery_level,
            signal_strength: self.signal_strength,
            timestamp: self.timestamp,
            source: self.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lat: f64, lng: f64) -> RecordPositionRequest {
        RecordPositionRequest {
            vehicle_id: Uuid::new_v4(),
            latitude: lat,
            longitude: lng,
            timestamp: Utc::now(),
            shipment_id: None,
            speed: None,
            heading: None,
            accuracy: None,
            battery_level: None,
            signal_strength: None,
            source: "GPS_DEVICE".to_string(),
        }
    }

    #[test]
    fn valid_coordinates_pass_validation() {
        assert!(request(-33.86, 151.20).validate().is_ok());
        assert!(request(90.0, 180.0).validate().is_ok());
        assert!(request(-90.0, -180.0).validate().is_ok());
    }

    #[test]
    fn out_of_range_coordinates_fail_validation() {
        assert!(request(91.0, 0.0).validate().is_err());
        assert!(request(-91.0, 0.0).validate().is_err());
        assert!(request(0.0, 181.0).validate().is_err());
        assert!(request(0.0, -180.5).validate().is_err());
    }

    #[test]
    fn partition_key_is_year_month() {
        let mut sample = request(10.0, 20.0).into_sample();
        sample.timestamp = "2024-03-15T10:30:00Z".parse().unwrap();
        assert_eq!(sample.partition_key(), "2024-03");
    }
}
