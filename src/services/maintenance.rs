// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance scheduler for spatial aggregates and housekeeping.
//!
//! Each job type runs idle → scheduled → running → idle per target. The
//! "scheduled" state is a short-lived cache marker with its own expiry,
//! independent of the job's runtime, so a burst of writes schedules one
//! refresh instead of hundreds. Jobs retry with exponential backoff up to
//! a bounded count; a run that exhausts its retries is logged and the next
//! trigger or tick starts fresh. All jobs are idempotent, so the rare
//! duplicate schedule (e.g. marker CAS unavailable) is harmless.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::services::geocache::{GeoCache, MarkerState};
use crate::store::{SpatialStore, StoreError};

/// Background job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    RefreshSpatialViews,
    RefreshFleetSummary,
    RefreshGeofenceStats,
    IndexMaintenance,
    PartitionMaintenance,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::RefreshSpatialViews => "refresh_spatial_views",
            JobKind::RefreshFleetSummary => "refresh_fleet_summary",
            JobKind::RefreshGeofenceStats => "refresh_geofence_stats",
            JobKind::IndexMaintenance => "index_maintenance",
            JobKind::PartitionMaintenance => "partition_maintenance",
        }
    }

    /// Parse an admin-facing job name.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "refresh_spatial_views" => Some(Self::RefreshSpatialViews),
            "refresh_fleet_summary" => Some(Self::RefreshFleetSummary),
            "refresh_geofence_stats" => Some(Self::RefreshGeofenceStats),
            "index_maintenance" => Some(Self::IndexMaintenance),
            "partition_maintenance" => Some(Self::PartitionMaintenance),
            _ => None,
        }
    }
}

/// Outcome of the conditional view-refresh policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Aggregate is stale and we are outside peak hours: refresh now.
    Refresh,
    /// Aggregate is stale but we are inside a peak window: defer. The
    /// periodic tick re-evaluates, so a deferral is never dropped.
    Deferred,
    /// Aggregate is fresh enough: nothing to do.
    Fresh,
}

/// Pure policy: should the spatial views be refreshed at `now`?
pub fn refresh_decision(
    computed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &Config,
) -> RefreshDecision {
    let Some(computed_at) = computed_at else {
        // Never computed: always worth a refresh, peak or not.
        return RefreshDecision::Refresh;
    };

    let staleness = now.signed_duration_since(computed_at);
    let threshold = chrono::Duration::from_std(config.view_staleness_threshold)
        .unwrap_or_else(|_| chrono::Duration::minutes(5));

    if staleness <= threshold {
        RefreshDecision::Fresh
    } else if config.is_peak_hour(now.hour()) {
        RefreshDecision::Deferred
    } else {
        RefreshDecision::Refresh
    }
}

#[derive(Clone)]
pub struct MaintenanceScheduler {
    store: Arc<dyn SpatialStore>,
    cache: Arc<GeoCache>,
    config: Arc<Config>,
}

impl MaintenanceScheduler {
    pub fn new(store: Arc<dyn SpatialStore>, cache: Arc<GeoCache>, config: Arc<Config>) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    fn marker_key(kind: JobKind, target: Option<Uuid>) -> String {
        match target {
            Some(id) => format!("fleet:maintenance:{}:{}", kind.as_str(), id),
            None => format!("fleet:maintenance:{}:all", kind.as_str()),
        }
    }

    fn marker_ttl(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::RefreshGeofenceStats => self.config.geofence_refresh_debounce,
            _ => self.config.fleet_refresh_debounce,
        }
    }

    /// Debounced scheduling: spawn the job unless one is already
    /// scheduled for the same (kind, target). Returns the marker state so
    /// callers and tests can observe the debounce.
    pub async fn schedule(&self, kind: JobKind, target: Option<Uuid>) -> MarkerState {
        let key = Self::marker_key(kind, target);
        let state = self
            .cache
            .try_acquire_marker(&key, self.marker_ttl(kind))
            .await;

        match state {
            MarkerState::Acquired => {
                let this = self.clone();
                tokio::spawn(async move {
                    this.run_job(kind, target, &key).await;
                });
            }
            MarkerState::AlreadyScheduled => {
                tracing::debug!(job = kind.as_str(), ?target, "Job already scheduled, debounced");
            }
        }
        state
    }

    /// Operational control surface: run a job now, bypassing the
    /// conditional refresh policy (the debounce marker still applies).
    pub async fn force_refresh(&self, kind: JobKind, target: Option<Uuid>) -> MarkerState {
        self.schedule(kind, target).await
    }

    /// Post-write hook for position ingestion: conditionally refresh the
    /// spatial views and debounce a fleet-summary refresh for the company.
    pub async fn notify_position_write(&self, company_id: Uuid) {
        self.maybe_refresh_views().await;
        self.schedule(JobKind::RefreshFleetSummary, Some(company_id))
            .await;
    }

    /// Post-write hook for geofence edits.
    pub async fn notify_geofence_change(&self, geofence_id: Uuid) {
        self.schedule(JobKind::RefreshGeofenceStats, Some(geofence_id))
            .await;
    }

    async fn maybe_refresh_views(&self) {
        let computed_at = match self.store.fleet_summary_computed_at().await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read aggregate staleness");
                return;
            }
        };

        match refresh_decision(computed_at, Utc::now(), &self.config) {
            RefreshDecision::Refresh => {
                self.schedule(JobKind::RefreshSpatialViews, None).await;
            }
            RefreshDecision::Deferred => {
                tracing::debug!("View refresh deferred: inside peak window");
            }
            RefreshDecision::Fresh => {}
        }
    }

    /// Start the periodic tickers. The view-refresh tick re-evaluates the
    /// conditional policy, which is what drives deferred refreshes once
    /// the peak window ends.
    pub fn spawn_periodic(&self) {
        let view = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(view.config.view_refresh_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                view.maybe_refresh_views().await;
            }
        });

        let index = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(index.config.index_maintenance_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                index.schedule(JobKind::IndexMaintenance, None).await;
            }
        });

        let partition = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(partition.config.partition_maintenance_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                partition.schedule(JobKind::PartitionMaintenance, None).await;
            }
        });

        tracing::info!("Maintenance tickers started");
    }

    async fn run_job(&self, kind: JobKind, target: Option<Uuid>, marker_key: &str) {
        let result = self.run_with_retry(kind, target).await;
        // scheduled → idle regardless of outcome; the next trigger may
        // schedule a fresh run immediately.
        self.cache.release_marker(marker_key).await;

        match result {
            Ok(()) => tracing::info!(job = kind.as_str(), ?target, "Maintenance job completed"),
            Err(e) => tracing::error!(
                job = kind.as_str(),
                ?target,
                error = %e,
                "Maintenance job failed for this run"
            ),
        }
    }

    async fn run_with_retry(&self, kind: JobKind, target: Option<Uuid>) -> Result<(), StoreError> {
        let mut attempt: u32 = 0;
        loop {
            match self.execute(kind, target).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.config.maintenance_max_retries => {
                    attempt += 1;
                    let delay = self.config.maintenance_retry_base_delay * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        job = kind.as_str(),
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "Maintenance job failed, retrying with backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute(&self, kind: JobKind, target: Option<Uuid>) -> Result<(), StoreError> {
        let operation = async {
            match kind {
                JobKind::RefreshSpatialViews => self.store.refresh_spatial_views().await,
                JobKind::RefreshFleetSummary => self.store.refresh_fleet_summary(target).await,
                JobKind::RefreshGeofenceStats => self.store.refresh_geofence_stats(target).await,
                JobKind::IndexMaintenance => self.store.maintain_indexes().await,
                JobKind::PartitionMaintenance => self
                    .store
                    .maintain_partitions(self.config.partition_retention_months)
                    .await
                    .map(|_| ()),
            }
        };

        tokio::time::timeout(self.config.store_maintenance_timeout, operation)
            .await
            .map_err(|_| StoreError("maintenance operation timed out".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        format!("2024-01-15T{:02}:{:02}:00Z", hour, minute)
            .parse()
            .unwrap()
    }

    #[test]
    fn never_computed_always_refreshes() {
        let config = Config::default();
        // Even inside the peak window
        assert_eq!(
            refresh_decision(None, at(8, 0), &config),
            RefreshDecision::Refresh
        );
    }

    #[test]
    fn fresh_aggregate_is_left_alone() {
        let config = Config::default();
        assert_eq!(
            refresh_decision(Some(at(12, 58)), at(13, 0), &config),
            RefreshDecision::Fresh
        );
    }

    #[test]
    fn stale_off_peak_refreshes() {
        let config = Config::default();
        assert_eq!(
            refresh_decision(Some(at(12, 0)), at(13, 0), &config),
            RefreshDecision::Refresh
        );
    }

    #[test]
    fn stale_in_peak_window_defers() {
        let config = Config::default();
        assert_eq!(
            refresh_decision(Some(at(7, 0)), at(8, 0), &config),
            RefreshDecision::Deferred
        );
        // Evening window too
        assert_eq!(
            refresh_decision(Some(at(17, 0)), at(18, 0), &config),
            RefreshDecision::Deferred
        );
    }

    #[test]
    fn deferred_refresh_approved_after_peak_window() {
        let config = Config::default();
        // Same stale aggregate, window has ended
        assert_eq!(
            refresh_decision(Some(at(7, 0)), at(10, 0), &config),
            RefreshDecision::Refresh
        );
    }

    #[test]
    fn job_kind_names_round_trip() {
        for kind in [
            JobKind::RefreshSpatialViews,
            JobKind::RefreshFleetSummary,
            JobKind::RefreshGeofenceStats,
            JobKind::IndexMaintenance,
            JobKind::PartitionMaintenance,
        ] {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::parse("defragment_everything"), None);
    }
}
