//! Application configuration loaded from environment variables.
//!
//! Every tuning knob the map/cache/maintenance pipeline uses lives here so
//! deployments can adjust behavior without a rebuild.

use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Redis connection URL for the geo-cache. When unset or unreachable
    /// the cache runs on a process-local fallback.
    pub redis_url: Option<String>,

    // --- Map performance ---
    /// Below this zoom: clusters. At or above: individual vehicles.
    pub cluster_zoom_threshold: u8,
    /// Cache TTL for clustered viewports.
    pub cluster_cache_ttl: Duration,
    /// Cache TTL for individual-vehicle viewports (shorter: they change faster).
    pub individual_cache_ttl: Duration,
    /// Cache TTL for fleet bounds (changes slowly).
    pub bounds_cache_ttl: Duration,
    /// Only vehicles reported within this window appear on high-zoom maps.
    pub freshness_window: Duration,
    /// Cap on individual vehicle features per viewport response.
    pub max_individual_vehicles: usize,
    /// A vehicle is "active" in the fleet overview if it reported this recently.
    pub overview_activity_window: Duration,

    // --- Geo-cache ---
    /// Geohash precision for cache key locality.
    pub geohash_precision: usize,
    /// Reduced precision for region invalidation prefixes.
    pub invalidation_precision: usize,
    /// Sample points per degree when walking the invalidation grid.
    pub invalidation_grid_steps_per_degree: u32,
    /// Radius invalidated around a position write.
    pub position_invalidation_radius_km: f64,
    /// Radius invalidated around a geofence edit (larger on purpose).
    pub geofence_invalidation_radius_km: f64,
    /// TTL for the point-level geofence intersection cache.
    pub intersection_cache_ttl: Duration,
    /// Per-operation cache timeout. A cache slower than this is a miss.
    pub cache_op_timeout: Duration,

    // --- Store timeouts ---
    /// Timeout for point lookups and single-row writes.
    pub store_write_timeout: Duration,
    /// Timeout for viewport/cluster queries.
    pub store_query_timeout: Duration,
    /// Timeout for maintenance operations (view refresh etc.).
    pub store_maintenance_timeout: Duration,

    // --- Maintenance scheduler ---
    /// Skip a view refresh if the aggregate is fresher than this.
    pub view_staleness_threshold: Duration,
    /// UTC hours during which fresh-enough refreshes are deferred.
    pub peak_hours: Vec<(u32, u32)>,
    /// Debounce marker TTL for fleet-summary refreshes.
    pub fleet_refresh_debounce: Duration,
    /// Debounce marker TTL for geofence-stat refreshes.
    pub geofence_refresh_debounce: Duration,
    /// Maximum retry attempts per maintenance run.
    pub maintenance_max_retries: u32,
    /// Base delay for exponential backoff between retries.
    pub maintenance_retry_base_delay: Duration,
    /// Periodic view-refresh tick (also re-drives deferred refreshes).
    pub view_refresh_interval: Duration,
    /// Periodic index maintenance tick.
    pub index_maintenance_interval: Duration,
    /// Periodic partition maintenance tick.
    pub partition_maintenance_interval: Duration,
    /// Position sample partitions older than this many months are dropped.
    pub partition_retention_months: u32,

    // --- Side effects ---
    /// Retry attempts for fire-and-forget cache invalidation.
    pub invalidation_max_retries: u32,
}

impl Default for Config {
    /// Default config for testing and local development.
    fn default() -> Self {
        Self {
            port: 8080,
            redis_url: None,
            cluster_zoom_threshold: 13,
            cluster_cache_ttl: Duration::from_secs(60),
            individual_cache_ttl: Duration::from_secs(30),
            bounds_cache_ttl: Duration::from_secs(300),
            freshness_window: Duration::from_secs(2 * 3600),
            max_individual_vehicles: 500,
            overview_activity_window: Duration::from_secs(30 * 60),
            geohash_precision: 6,
            invalidation_precision: 4,
            invalidation_grid_steps_per_degree: 10,
            position_invalidation_radius_km: 2.0,
            geofence_invalidation_radius_km: 5.0,
            intersection_cache_ttl: Duration::from_secs(300),
            cache_op_timeout: Duration::from_millis(250),
            store_write_timeout: Duration::from_secs(5),
            store_query_timeout: Duration::from_secs(10),
            store_maintenance_timeout: Duration::from_secs(30),
            view_staleness_threshold: Duration::from_secs(300),
            peak_hours: vec![(7, 9), (17, 19)],
            fleet_refresh_debounce: Duration::from_secs(60),
            geofence_refresh_debounce: Duration::from_secs(300),
            maintenance_max_retries: 3,
            maintenance_retry_base_delay: Duration::from_secs(60),
            view_refresh_interval: Duration::from_secs(300),
            index_maintenance_interval: Duration::from_secs(3600),
            partition_maintenance_interval: Duration::from_secs(86400),
            partition_retention_months: 12,
            invalidation_max_retries: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults above for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        Ok(Self {
            port: parse_env("PORT", defaults.port)?,
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            cluster_zoom_threshold: parse_env(
                "CLUSTER_ZOOM_THRESHOLD",
                defaults.cluster_zoom_threshold,
            )?,
            cluster_cache_ttl: secs_env("CLUSTER_CACHE_TTL_SECS", defaults.cluster_cache_ttl)?,
            individual_cache_ttl: secs_env(
                "INDIVIDUAL_CACHE_TTL_SECS",
                defaults.individual_cache_ttl,
            )?,
            bounds_cache_ttl: secs_env("BOUNDS_CACHE_TTL_SECS", defaults.bounds_cache_ttl)?,
            freshness_window: secs_env("FRESHNESS_WINDOW_SECS", defaults.freshness_window)?,
            max_individual_vehicles: parse_env(
                "MAX_INDIVIDUAL_VEHICLES",
                defaults.max_individual_vehicles,
            )?,
            overview_activity_window: secs_env(
                "OVERVIEW_ACTIVITY_WINDOW_SECS",
                defaults.overview_activity_window,
            )?,
            geohash_precision: parse_env("GEOHASH_PRECISION", defaults.geohash_precision)?,
            invalidation_precision: parse_env(
                "INVALIDATION_PRECISION",
                defaults.invalidation_precision,
            )?,
            invalidation_grid_steps_per_degree: parse_env(
                "INVALIDATION_GRID_STEPS",
                defaults.invalidation_grid_steps_per_degree,
            )?,
            position_invalidation_radius_km: parse_env(
                "POSITION_INVALIDATION_RADIUS_KM",
                defaults.position_invalidation_radius_km,
            )?,
            geofence_invalidation_radius_km: parse_env(
                "GEOFENCE_INVALIDATION_RADIUS_KM",
                defaults.geofence_invalidation_radius_km,
            )?,
            intersection_cache_ttl: secs_env(
                "INTERSECTION_CACHE_TTL_SECS",
                defaults.intersection_cache_ttl,
            )?,
            cache_op_timeout: millis_env("CACHE_OP_TIMEOUT_MS", defaults.cache_op_timeout)?,
            store_write_timeout: secs_env("STORE_WRITE_TIMEOUT_SECS", defaults.store_write_timeout)?,
            store_query_timeout: secs_env("STORE_QUERY_TIMEOUT_SECS", defaults.store_query_timeout)?,
            store_maintenance_timeout: secs_env(
                "STORE_MAINTENANCE_TIMEOUT_SECS",
                defaults.store_maintenance_timeout,
            )?,
            view_staleness_threshold: secs_env(
                "VIEW_STALENESS_THRESHOLD_SECS",
                defaults.view_staleness_threshold,
            )?,
            peak_hours: parse_peak_hours(
                &env::var("PEAK_HOURS").unwrap_or_else(|_| "7-9,17-19".to_string()),
            )?,
            fleet_refresh_debounce: secs_env(
                "FLEET_REFRESH_DEBOUNCE_SECS",
                defaults.fleet_refresh_debounce,
            )?,
            geofence_refresh_debounce: secs_env(
                "GEOFENCE_REFRESH_DEBOUNCE_SECS",
                defaults.geofence_refresh_debounce,
            )?,
            maintenance_max_retries: parse_env(
                "MAINTENANCE_MAX_RETRIES",
                defaults.maintenance_max_retries,
            )?,
            maintenance_retry_base_delay: secs_env(
                "MAINTENANCE_RETRY_BASE_DELAY_SECS",
                defaults.maintenance_retry_base_delay,
            )?,
            view_refresh_interval: secs_env(
                "VIEW_REFRESH_INTERVAL_SECS",
                defaults.view_refresh_interval,
            )?,
            index_maintenance_interval: secs_env(
                "INDEX_MAINTENANCE_INTERVAL_SECS",
                defaults.index_maintenance_interval,
            )?,
            partition_maintenance_interval: secs_env(
                "PARTITION_MAINTENANCE_INTERVAL_SECS",
                defaults.partition_maintenance_interval,
            )?,
            partition_retention_months: parse_env(
                "PARTITION_RETENTION_MONTHS",
                defaults.partition_retention_months,
            )?,
            invalidation_max_retries: parse_env(
                "INVALIDATION_MAX_RETRIES",
                defaults.invalidation_max_retries,
            )?,
        })
    }

    /// Whether the given UTC hour falls inside a configured peak window.
    pub fn is_peak_hour(&self, hour: u32) -> bool {
        self.peak_hours
            .iter()
            .any(|&(start, end)| hour >= start && hour <= end)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn secs_env(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parse_env(
        name,
        default.as_secs(),
    )?))
}

fn millis_env(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    Ok(Duration::from_millis(parse_env(
        name,
        default.as_millis() as u64,
    )?))
}

/// Parse "7-9,17-19" into inclusive (start, end) UTC hour ranges.
fn parse_peak_hours(raw: &str) -> Result<Vec<(u32, u32)>, ConfigError> {
    let mut windows = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (start, end) = part
            .trim()
            .split_once('-')
            .ok_or(ConfigError::Invalid("PEAK_HOURS"))?;
        let start: u32 = start.parse().map_err(|_| ConfigError::Invalid("PEAK_HOURS"))?;
        let end: u32 = end.parse().map_err(|_| ConfigError::Invalid("PEAK_HOURS"))?;
        if start > end || end > 23 {
            return Err(ConfigError::Invalid("PEAK_HOURS"));
        }
        windows.push((start, end));
    }
    Ok(windows)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cluster_zoom_threshold, 13);
        assert_eq!(config.max_individual_vehicles, 500);
        assert_eq!(config.geohash_precision, 6);
        assert_eq!(config.cluster_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.individual_cache_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_peak_hours_parsing() {
        assert_eq!(parse_peak_hours("7-9,17-19").unwrap(), vec![(7, 9), (17, 19)]);
        assert_eq!(parse_peak_hours("").unwrap(), vec![]);
        assert!(parse_peak_hours("9-7").is_err());
        assert!(parse_peak_hours("22-25").is_err());
        assert!(parse_peak_hours("bogus").is_err());
    }

    #[test]
    fn test_is_peak_hour() {
        let config = Config::default();
        assert!(config.is_peak_hour(7));
        assert!(config.is_peak_hour(9));
        assert!(config.is_peak_hour(18));
        assert!(!config.is_peak_hour(12));
        assert!(!config.is_peak_hour(3));
    }
}
