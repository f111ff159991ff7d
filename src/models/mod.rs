// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod geofence;
pub mod map;
pub mod position;
pub mod vehicle;
pub mod visit;

pub use geofence::{FenceBoundary, FencePolicy, Geofence};
pub use map::{BoundingBox, DisplayMode, IndividualVehicle, VehicleCluster};
pub use position::{PositionSample, RecordPositionRequest};
pub use vehicle::Vehicle;
pub use visit::{LocationVisit, VisitFilter, VisitStatus};
