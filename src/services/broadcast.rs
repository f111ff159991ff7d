// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Real-time event fan-out.
//!
//! Per-group broadcast channels for live viewers. Delivery is best-effort,
//! at-most-once per connected subscriber: lagging receivers drop messages
//! and there is no replay. A reconnecting client requests a fresh snapshot
//! from the map service instead of missed events. The wire transport
//! (WebSocket framing, auth handshake) is a collaborator's concern; this
//! hub is the in-process fan-out they subscribe to.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered events per group channel before laggards start losing messages.
const GROUP_CHANNEL_CAPACITY: usize = 256;

/// Events published to tracking viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    LocationUpdate {
        vehicle_id: Uuid,
        latitude: f64,
        longitude: f64,
        speed: Option<f64>,
        heading: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    GeofenceEvent {
        vehicle_id: Uuid,
        geofence_id: Uuid,
        geofence_name: String,
        event_type: GeofenceEventType,
        visit_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    EmergencyAlert {
        vehicle_id: Uuid,
        alert_type: String,
        message: String,
        latitude: Option<f64>,
        longitude: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    FleetUpdate {
        update_type: String,
        company_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeofenceEventType {
    Entered,
    Exited,
}

/// Group name for a single vehicle's viewers.
pub fn vehicle_group(vehicle_id: Uuid) -> String {
    format!("vehicle:{}", vehicle_id)
}

/// Group name for a company's fleet viewers.
pub fn fleet_group(company_id: Uuid) -> String {
    format!("fleet:{}", company_id)
}

/// Fan-out hub over per-group broadcast channels.
#[derive(Default)]
pub struct BroadcastHub {
    groups: DashMap<String, broadcast::Sender<TrackingEvent>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a group. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, group: &str) -> broadcast::Receiver<TrackingEvent> {
        self.groups
            .entry(group.to_string())
            .or_insert_with(|| broadcast::channel(GROUP_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a group. Returns the number of subscribers the
    /// event reached; an empty or unknown group drops it silently.
    pub fn publish(&self, group: &str, event: TrackingEvent) -> usize {
        let Some(sender) = self.groups.get(group) else {
            return 0;
        };
        // send() only errors when there are no receivers
        let reached = sender.send(event).unwrap_or(0);
        drop(sender);

        if reached == 0 {
            self.prune(group);
        }
        reached
    }

    /// Publish an emergency to the vehicle's viewers and the owning fleet.
    pub fn publish_emergency(&self, vehicle_id: Uuid, company_id: Uuid, event: TrackingEvent) {
        self.publish(&vehicle_group(vehicle_id), event.clone());
        let reached = self.publish(&fleet_group(company_id), event);
        tracing::warn!(
            %vehicle_id,
            %company_id,
            fleet_subscribers = reached,
            "Emergency alert broadcast"
        );
    }

    /// Number of live subscribers in a group.
    pub fn subscriber_count(&self, group: &str) -> usize {
        self.groups
            .get(group)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drop a group's channel once its last receiver is gone.
    fn prune(&self, group: &str) {
        self.groups
            .remove_if(group, |_, sender| sender.receiver_count() == 0);
    }
}
