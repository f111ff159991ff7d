// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vehicle model (the slice of it this subsystem owns).
//!
//! `last_known_location` and `last_reported_at` are mutated exclusively by
//! the ingestion path, last-writer-wins by sample timestamp.

use chrono::{DateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Registration plate (e.g. "XYZ-123")
    pub registration: String,
    /// Operational status: "ACTIVE", "MAINTENANCE", ...
    pub status: String,
    pub last_known_latitude: Option<f64>,
    pub last_known_longitude: Option<f64>,
    pub last_reported_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    pub fn last_known_point(&self) -> Option<Point<f64>> {
        match (self.last_known_longitude, self.last_known_latitude) {
            (Some(lng), Some(lat)) => Some(Point::new(lng, lat)),
            _ => None,
        }
    }

    /// Whether a sample at `timestamp` should advance the vehicle's
    /// last-known state. Older or duplicate-timestamp samples are stored
    /// but must not regress the vehicle.
    pub fn accepts_report_at(&self, timestamp: DateTime<Utc>) -> bool {
        match self.last_reported_at {
            Some(last) => timestamp > last,
            None => true,
        }
    }
}
