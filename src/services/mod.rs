// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod broadcast;
pub mod demurrage;
pub mod geocache;
pub mod geofence;
pub mod ingest;
pub mod maintenance;
pub mod map_performance;

pub use broadcast::BroadcastHub;
pub use demurrage::{compute_demurrage, Demurrage};
pub use geocache::GeoCache;
pub use geofence::GeofenceEngine;
pub use ingest::IngestService;
pub use maintenance::MaintenanceScheduler;
pub use map_performance::MapPerformanceService;

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::store::StoreResult;

/// Run a store operation under a timeout. A store that does not answer in
/// time surfaces as a retryable `StoreUnavailable`, never as a hang.
pub(crate) async fn store_call<T, F>(timeout: Duration, operation: F) -> Result<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::StoreUnavailable(
            "spatial store query timed out".to_string(),
        )),
    }
}
