// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location visit lifecycle model.
//!
//! A visit is a time-bounded record of a vehicle's presence inside a
//! geofence. At most one ACTIVE visit may exist per (vehicle, geofence)
//! pair; COMPLETED and CANCELLED are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visit lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Active,
    Completed,
    Cancelled,
}

/// A vehicle's stay inside a geofence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationVisit {
    pub id: Uuid,
    pub geofence_id: Uuid,
    pub vehicle_id: Uuid,
    pub shipment_id: Option<Uuid>,
    pub entry_time: DateTime<Utc>,
    /// None while the visit is active.
    pub exit_time: Option<DateTime<Utc>>,
    pub entry_sample_id: Uuid,
    pub exit_sample_id: Option<Uuid>,
    pub status: VisitStatus,
    pub demurrage_hours: Option<f64>,
    pub demurrage_charge: Option<f64>,
}

impl LocationVisit {
    /// Open a new visit from an entry sample.
    pub fn open(
        geofence_id: Uuid,
        vehicle_id: Uuid,
        shipment_id: Option<Uuid>,
        entry_time: DateTime<Utc>,
        entry_sample_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            geofence_id,
            vehicle_id,
            shipment_id,
            entry_time,
            exit_time: None,
            entry_sample_id,
            exit_sample_id: None,
            status: VisitStatus::Active,
            demurrage_hours: None,
            demurrage_charge: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == VisitStatus::Active && self.exit_time.is_none()
    }

    /// Visit duration in fractional hours, or None while still active.
    pub fn duration_hours(&self) -> Option<f64> {
        let exit = self.exit_time?;
        let seconds = exit.signed_duration_since(self.entry_time).num_seconds();
        Some(seconds as f64 / 3600.0)
    }

    /// Close the visit with an exit sample. Exit time must not precede
    /// entry time; out-of-order exits are clamped to the entry time.
    pub fn close(&mut self, exit_time: DateTime<Utc>, exit_sample_id: Uuid) {
        self.exit_time = Some(exit_time.max(self.entry_time));
        self.exit_sample_id = Some(exit_sample_id);
        self.status = VisitStatus::Completed;
    }

    /// Administrative cancellation. Terminal.
    pub fn cancel(&mut self) {
        self.status = VisitStatus::Cancelled;
    }
}

/// Filter for visit queries from billing/audit consumers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitFilter {
    pub vehicle_id: Option<Uuid>,
    pub geofence_id: Option<Uuid>,
    pub shipment_id: Option<Uuid>,
    pub status: Option<VisitStatus>,
}

impl VisitFilter {
    pub fn matches(&self, visit: &LocationVisit) -> bool {
        self.vehicle_id.is_none_or(|v| visit.vehicle_id == v)
            && self.geofence_id.is_none_or(|g| visit.geofence_id == g)
            && self.shipment_id.is_none_or(|s| visit.shipment_id == Some(s))
            && self.status.is_none_or(|s| visit.status == s)
    }
}
