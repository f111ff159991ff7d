// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Distributed geo-cache for map viewport payloads.
//!
//! Keys embed a geohash of the viewport centroid so physically nearby
//! viewports share key prefixes, which makes region invalidation a prefix
//! scan. The cache is strictly best-effort: redis being slow or down turns
//! every operation into a miss and the request falls through to the
//! spatial store.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::BoundingBox;
use crate::time_utils::format_utc_rfc3339;

const GEOHASH_BASE32: &[u8] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Encode a latitude/longitude into a geohash of the given precision.
pub fn encode_geohash(lat: f64, lng: f64, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lng_range = (-180.0_f64, 180.0_f64);

    let mut geohash = String::with_capacity(precision);
    let mut bits = 0u8;
    let mut bit = 0u32;
    let mut ch = 0usize;

    while geohash.len() < precision {
        if bit % 2 == 0 {
            // longitude
            let mid = (lng_range.0 + lng_range.1) / 2.0;
            if lng >= mid {
                ch |= 1 << (4 - bits);
                lng_range.0 = mid;
            } else {
                lng_range.1 = mid;
            }
        } else {
            // latitude
            let mid = (lat_range.0 + lat_range.1) / 2.0;
            if lat >= mid {
                ch |= 1 << (4 - bits);
                lat_range.0 = mid;
            } else {
                lat_range.1 = mid;
            }
        }

        bit += 1;
        bits += 1;
        if bits == 5 {
            geohash.push(GEOHASH_BASE32[ch] as char);
            bits = 0;
            ch = 0;
        }
    }

    geohash
}

/// Result of a debounce-marker acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    Acquired,
    AlreadyScheduled,
}

/// Metadata stored beside each cached map payload, retrievable without
/// deserializing the payload itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    pub created_at: String,
    pub zoom: u8,
    pub company_id: Option<Uuid>,
    pub geo_hash: String,
    pub ttl_secs: u64,
}

/// Cache performance counters for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub backend: &'static str,
    /// Key count for the in-process backend; None when redis-backed.
    pub local_key_count: Option<usize>,
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn delete_matching(&self, prefix: &str, company_tag: Option<&str>) -> u64 {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.key().clone())
            .filter(|key| key.starts_with(prefix))
            .filter(|key| company_tag.is_none_or(|tag| key.contains(tag)))
            .collect();
        let count = doomed.len() as u64;
        for key in doomed {
            self.entries.remove(&key);
        }
        count
    }

    fn try_acquire(&self, key: &str, ttl: Duration) -> MarkerState {
        use dashmap::mapref::entry::Entry;
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(occupied) if occupied.get().expires_at > now => {
                MarkerState::AlreadyScheduled
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(MemoryEntry {
                    value: "1".to_string(),
                    expires_at: now + ttl,
                });
                MarkerState::Acquired
            }
            Entry::Vacant(vacant) => {
                vacant.insert(MemoryEntry {
                    value: "1".to_string(),
                    expires_at: now + ttl,
                });
                MarkerState::Acquired
            }
        }
    }
}

enum Backend {
    Redis(redis::aio::ConnectionManager),
    Memory(MemoryBackend),
}

/// Geography-aware cache fronting the map performance service.
pub struct GeoCache {
    backend: Backend,
    geohash_precision: usize,
    invalidation_precision: usize,
    grid_steps_per_degree: u32,
    op_timeout: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GeoCache {
    /// Connect to redis, falling back to the process-local backend when no
    /// URL is configured or the connection cannot be established.
    pub async fn connect(config: &Config) -> Self {
        let backend = match &config.redis_url {
            Some(url) => match Self::redis_backend(url).await {
                Ok(manager) => {
                    tracing::info!("Geo-cache connected to redis");
                    Backend::Redis(manager)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, using in-process cache fallback");
                    Backend::Memory(MemoryBackend::default())
                }
            },
            None => {
                tracing::info!("No REDIS_URL configured, using in-process cache");
                Backend::Memory(MemoryBackend::default())
            }
        };

        Self::with_backend(backend, config)
    }

    /// Process-local cache, used by tests and single-node deployments.
    pub fn in_memory(config: &Config) -> Self {
        Self::with_backend(Backend::Memory(MemoryBackend::default()), config)
    }

    fn with_backend(backend: Backend, config: &Config) -> Self {
        Self {
            backend,
            geohash_precision: config.geohash_precision,
            invalidation_precision: config.invalidation_precision,
            grid_steps_per_degree: config.invalidation_grid_steps_per_degree,
            op_timeout: config.cache_op_timeout,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    async fn redis_backend(url: &str) -> Result<redis::aio::ConnectionManager, redis::RedisError> {
        let client = redis::Client::open(url)?;
        client.get_connection_manager().await
    }

    // ─── Key construction ────────────────────────────────────────

    fn company_tag(company_id: Option<Uuid>) -> String {
        match company_id {
            Some(id) => format!("c{}", id),
            None => "call".to_string(),
        }
    }

    /// Map payload key: geohash of the viewport centroid first so nearby
    /// viewports share prefixes, then zoom/company/bounds discriminators.
    pub fn map_key(&self, bounds: &BoundingBox, zoom: u8, company_id: Option<Uuid>) -> String {
        let center = bounds.center();
        let geo_hash = encode_geohash(center.y(), center.x(), self.geohash_precision);
        format!(
            "fleet:map:{}:z{}:{}:b{}",
            geo_hash,
            zoom,
            Self::company_tag(company_id),
            bounds.fingerprint()
        )
    }

    fn bounds_key(company_id: Option<Uuid>) -> String {
        format!("fleet:bounds:{}", Self::company_tag(company_id))
    }

    fn intersection_key(company_id: Uuid, lat: f64, lng: f64) -> String {
        format!("fleet:fence:intersect:{}:{:.6}:{:.6}", company_id, lng, lat)
    }

    // ─── Map payloads ────────────────────────────────────────────

    pub async fn get_map(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        company_id: Option<Uuid>,
    ) -> Option<serde_json::Value> {
        let key = self.map_key(bounds, zoom, company_id);
        let raw = self.get_raw(&key).await;
        match raw {
            Some(raw) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                serde_json::from_str(&raw).ok()
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn set_map(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        company_id: Option<Uuid>,
        payload: &serde_json::Value,
        ttl: Duration,
    ) {
        let key = self.map_key(bounds, zoom, company_id);
        let Ok(serialized) = serde_json::to_string(payload) else {
            return;
        };
        self.set_raw(&key, serialized, ttl).await;

        let center = bounds.center();
        let meta = CacheEntryMeta {
            created_at: format_utc_rfc3339(Utc::now()),
            zoom,
            company_id,
            geo_hash: encode_geohash(center.y(), center.x(), self.geohash_precision),
            ttl_secs: ttl.as_secs(),
        };
        if let Ok(serialized_meta) = serde_json::to_string(&meta) {
            // Metadata outlives the payload slightly so diagnostics can
            // still see recently expired entries.
            self.set_raw(&format!("{}:meta", key), serialized_meta, ttl + Duration::from_secs(60))
                .await;
        }
    }

    /// Entry metadata without touching the payload.
    pub async fn get_map_meta(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        company_id: Option<Uuid>,
    ) -> Option<CacheEntryMeta> {
        let key = format!("{}:meta", self.map_key(bounds, zoom, company_id));
        let raw = self.get_raw(&key).await?;
        serde_json::from_str(&raw).ok()
    }

    // ─── Typed side entries (fleet bounds, intersection results) ─

    pub async fn get_bounds(&self, company_id: Option<Uuid>) -> Option<BoundingBox> {
        self.get_json(&Self::bounds_key(company_id)).await
    }

    pub async fn set_bounds(&self, company_id: Option<Uuid>, bounds: &BoundingBox, ttl: Duration) {
        self.set_json(&Self::bounds_key(company_id), bounds, ttl).await;
    }

    pub async fn get_intersections(
        &self,
        company_id: Uuid,
        lat: f64,
        lng: f64,
    ) -> Option<Vec<Uuid>> {
        self.get_json(&Self::intersection_key(company_id, lat, lng))
            .await
    }

    pub async fn set_intersections(
        &self,
        company_id: Uuid,
        lat: f64,
        lng: f64,
        geofence_ids: &[Uuid],
        ttl: Duration,
    ) {
        self.set_json(&Self::intersection_key(company_id, lat, lng), &geofence_ids, ttl)
            .await;
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        serde_json::from_str(&raw).ok()
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if let Ok(serialized) = serde_json::to_string(value) {
            self.set_raw(key, serialized, ttl).await;
        }
    }

    // ─── Region invalidation ─────────────────────────────────────

    /// Geohash prefixes covering a circle around a point. Over-covers on
    /// purpose: invalidating a little extra beats serving a stale tile to
    /// a viewport whose edge the update landed on.
    fn region_geohashes(&self, center_lat: f64, center_lng: f64, radius_km: f64) -> Vec<String> {
        let lat_delta = radius_km / 111.0;
        let lng_delta = radius_km / (111.0 * (center_lat / 90.0).abs() + 0.1);

        let min_lat = center_lat - lat_delta;
        let max_lat = center_lat + lat_delta;
        let min_lng = center_lng - lng_delta;
        let max_lng = center_lng + lng_delta;

        let steps = f64::from(self.grid_steps_per_degree);
        let lat_steps = ((lat_delta * 2.0 * steps) as u32).max(1);
        let lng_steps = ((lng_delta * 2.0 * steps) as u32).max(1);

        let mut prefixes = std::collections::HashSet::new();
        for lat_step in 0..=lat_steps {
            let lat = min_lat + (f64::from(lat_step) / f64::from(lat_steps)) * (max_lat - min_lat);
            for lng_step in 0..=lng_steps {
                let lng =
                    min_lng + (f64::from(lng_step) / f64::from(lng_steps)) * (max_lng - min_lng);
                prefixes.insert(encode_geohash(lat, lng, self.invalidation_precision));
            }
        }
        prefixes.into_iter().collect()
    }

    /// Delete every cached map entry whose key prefix falls inside the
    /// affected circle. Returns the number of deleted keys. Unlike reads,
    /// an invalidation that could not reach redis is reported as an error
    /// so the dispatcher can retry it; stale entries still age out by TTL.
    pub async fn invalidate_region(
        &self,
        center_lat: f64,
        center_lng: f64,
        radius_km: f64,
        company_id: Option<Uuid>,
    ) -> Result<u64, AppError> {
        let prefixes = self.region_geohashes(center_lat, center_lng, radius_km);
        let company_tag = company_id.map(|id| format!(":c{}:", id));

        let mut deleted = 0;
        for prefix in &prefixes {
            deleted += match &self.backend {
                Backend::Memory(memory) => memory
                    .delete_matching(&format!("fleet:map:{}", prefix), company_tag.as_deref()),
                Backend::Redis(manager) => self
                    .redis_delete_matching(manager.clone(), prefix, company_tag.as_deref())
                    .await
                    .map_err(AppError::CacheUnavailable)?,
            };
        }

        tracing::info!(
            center_lat,
            center_lng,
            radius_km,
            prefixes = prefixes.len(),
            deleted,
            "Invalidated cache region"
        );
        Ok(deleted)
    }

    async fn redis_delete_matching(
        &self,
        mut manager: redis::aio::ConnectionManager,
        prefix: &str,
        company_tag: Option<&str>,
    ) -> Result<u64, String> {
        let pattern = match company_tag {
            Some(tag) => format!("fleet:map:{}*{}*", prefix, tag),
            None => format!("fleet:map:{}*", prefix),
        };

        let scan = self
            .with_timeout(async {
                let mut keys = Vec::new();
                let mut iter = manager.scan_match::<_, String>(&pattern).await?;
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
                Ok::<_, redis::RedisError>(keys)
            })
            .await;

        let keys = match scan {
            Some(Ok(keys)) => keys,
            Some(Err(e)) => return Err(format!("scan failed: {}", e)),
            None => return Err("scan timed out".to_string()),
        };
        if keys.is_empty() {
            return Ok(0);
        }

        let mut doomed = Vec::with_capacity(keys.len() * 2);
        for key in &keys {
            doomed.push(format!("{}:meta", key));
        }
        doomed.extend(keys);

        let deleted = self
            .with_timeout(async move { manager.del::<_, u64>(doomed).await })
            .await;
        match deleted {
            Some(Ok(n)) => Ok(n),
            Some(Err(e)) => Err(format!("delete failed: {}", e)),
            None => Err("delete timed out".to_string()),
        }
    }

    // ─── Debounce markers ────────────────────────────────────────

    /// Try to acquire a short-lived scheduling marker. Atomic on redis
    /// (SET NX EX); on the in-process backend, atomic within the process.
    pub async fn try_acquire_marker(&self, key: &str, ttl: Duration) -> MarkerState {
        match &self.backend {
            Backend::Memory(memory) => memory.try_acquire(key, ttl),
            Backend::Redis(manager) => {
                let mut manager = manager.clone();
                let ttl_secs = ttl.as_secs().max(1);
                let key = key.to_string();
                let result = self
                    .with_timeout(async move {
                        let reply: Option<String> = redis::cmd("SET")
                            .arg(&key)
                            .arg("1")
                            .arg("NX")
                            .arg("EX")
                            .arg(ttl_secs)
                            .query_async(&mut manager)
                            .await?;
                        Ok::<_, redis::RedisError>(reply)
                    })
                    .await;
                match result {
                    Some(Ok(Some(_))) => MarkerState::Acquired,
                    Some(Ok(None)) => MarkerState::AlreadyScheduled,
                    // Cache trouble: allow the schedule rather than wedge
                    // maintenance; duplicate runs are idempotent.
                    _ => MarkerState::Acquired,
                }
            }
        }
    }

    /// Drop a marker once its job completed.
    pub async fn release_marker(&self, key: &str) {
        match &self.backend {
            Backend::Memory(memory) => {
                memory.entries.remove(key);
            }
            Backend::Redis(manager) => {
                let mut manager = manager.clone();
                let key = key.to_string();
                let _ = self
                    .with_timeout(async move { manager.del::<_, u64>(key).await })
                    .await;
            }
        }
    }

    // ─── Diagnostics ─────────────────────────────────────────────

    pub fn stats(&self) -> CacheStats {
        let hit_count = self.hits.load(Ordering::Relaxed);
        let miss_count = self.misses.load(Ordering::Relaxed);
        let total = hit_count + miss_count;
        let hit_rate = if total > 0 {
            hit_count as f64 / total as f64
        } else {
            0.0
        };
        let (backend, local_key_count) = match &self.backend {
            Backend::Redis(_) => ("redis", None),
            Backend::Memory(memory) => ("memory", Some(memory.entries.len())),
        };
        CacheStats {
            hit_count,
            miss_count,
            hit_rate,
            backend,
            local_key_count,
        }
    }

    // ─── Raw ops with degradation ────────────────────────────────

    async fn get_raw(&self, key: &str) -> Option<String> {
        match &self.backend {
            Backend::Memory(memory) => memory.get(key),
            Backend::Redis(manager) => {
                let mut manager = manager.clone();
                let key = key.to_string();
                let result = self
                    .with_timeout(async move { manager.get::<_, Option<String>>(key).await })
                    .await;
                match result {
                    Some(Ok(value)) => value,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Cache read failed, treating as miss");
                        None
                    }
                    None => {
                        tracing::debug!("Cache read timed out, treating as miss");
                        None
                    }
                }
            }
        }
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) {
        match &self.backend {
            Backend::Memory(memory) => memory.set(key, value, ttl),
            Backend::Redis(manager) => {
                let mut manager = manager.clone();
                let key = key.to_string();
                let ttl_secs = ttl.as_secs().max(1);
                let result = self
                    .with_timeout(
                        async move { manager.set_ex::<_, _, ()>(key, value, ttl_secs).await },
                    )
                    .await;
                if !matches!(result, Some(Ok(()))) {
                    tracing::debug!("Cache write failed or timed out, entry skipped");
                }
            }
        }
    }

    /// Bound a cache operation; None means it timed out.
    async fn with_timeout<T, F>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.op_timeout, fut).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_cache() -> GeoCache {
        GeoCache::in_memory(&Config::default())
    }

    fn sydney_viewport() -> BoundingBox {
        BoundingBox::new(-34.0, 150.9, -33.7, 151.4)
    }

    #[test]
    fn geohash_known_values() {
        // Well-known geohash test vectors
        assert_eq!(encode_geohash(57.64911, 10.40744, 11), "u4pruydqqvj");
        assert_eq!(encode_geohash(-33.86, 151.20, 6), "r3gx2e");
        assert_eq!(encode_geohash(0.0, 0.0, 4), "s000");
    }

    #[test]
    fn geohash_prefix_shrinks_with_precision() {
        let full = encode_geohash(-33.86, 151.20, 6);
        let coarse = encode_geohash(-33.86, 151.20, 4);
        assert!(full.starts_with(&coarse));
    }

    #[test]
    fn nearby_points_share_coarse_prefix() {
        let a = encode_geohash(-33.8600, 151.2000, 4);
        let b = encode_geohash(-33.8650, 151.2050, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn map_key_shape() {
        let cache = test_cache();
        let key = cache.map_key(&sydney_viewport(), 12, None);
        assert!(key.starts_with("fleet:map:"));
        assert!(key.contains(":z12:"));
        assert!(key.contains(":call:"));

        let company = Uuid::new_v4();
        let company_key = cache.map_key(&sydney_viewport(), 12, Some(company));
        assert!(company_key.contains(&format!(":c{}:", company)));
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = test_cache();
        let bounds = sydney_viewport();
        let payload = json!({"type": "FeatureCollection", "features": []});

        cache
            .set_map(&bounds, 12, None, &payload, Duration::from_secs(60))
            .await;
        let cached = cache.get_map(&bounds, 12, None).await;
        assert_eq!(cached, Some(payload));

        // Different zoom is a different entry
        assert!(cache.get_map(&bounds, 13, None).await.is_none());
    }

    #[tokio::test]
    async fn metadata_readable_without_payload() {
        let cache = test_cache();
        let bounds = sydney_viewport();
        cache
            .set_map(&bounds, 12, None, &json!({"big": "payload"}), Duration::from_secs(30))
            .await;

        let meta = cache.get_map_meta(&bounds, 12, None).await.unwrap();
        assert_eq!(meta.zoom, 12);
        assert_eq!(meta.ttl_secs, 30);
        assert_eq!(meta.geo_hash.len(), 6);
    }

    #[tokio::test]
    async fn invalidate_region_covering_centroid_causes_miss() {
        let cache = test_cache();
        let bounds = sydney_viewport();
        cache
            .set_map(&bounds, 12, None, &json!({"x": 1}), Duration::from_secs(60))
            .await;

        let center = bounds.center();
        let deleted = cache
            .invalidate_region(center.y(), center.x(), 5.0, None)
            .await
            .unwrap();
        assert!(deleted >= 1);
        assert!(cache.get_map(&bounds, 12, None).await.is_none());
    }

    #[tokio::test]
    async fn invalidation_is_company_scoped_when_filtered() {
        let cache = test_cache();
        let bounds = sydney_viewport();
        let company_a = Uuid::new_v4();
        let company_b = Uuid::new_v4();
        cache
            .set_map(&bounds, 12, Some(company_a), &json!({"a": 1}), Duration::from_secs(60))
            .await;
        cache
            .set_map(&bounds, 12, Some(company_b), &json!({"b": 1}), Duration::from_secs(60))
            .await;

        let center = bounds.center();
        cache
            .invalidate_region(center.y(), center.x(), 5.0, Some(company_a))
            .await
            .unwrap();

        assert!(cache.get_map(&bounds, 12, Some(company_a)).await.is_none());
        assert!(cache.get_map(&bounds, 12, Some(company_b)).await.is_some());
    }

    #[tokio::test]
    async fn far_away_invalidation_leaves_entry() {
        let cache = test_cache();
        let bounds = sydney_viewport();
        cache
            .set_map(&bounds, 12, None, &json!({"x": 1}), Duration::from_secs(60))
            .await;

        // Perth is ~3300 km from Sydney
        cache
            .invalidate_region(-31.95, 115.86, 10.0, None)
            .await
            .unwrap();
        assert!(cache.get_map(&bounds, 12, None).await.is_some());
    }

    #[tokio::test]
    async fn marker_debounces_until_released() {
        let cache = test_cache();
        let key = "fleet:maintenance:fleet_summary:call";

        assert_eq!(
            cache.try_acquire_marker(key, Duration::from_secs(60)).await,
            MarkerState::Acquired
        );
        assert_eq!(
            cache.try_acquire_marker(key, Duration::from_secs(60)).await,
            MarkerState::AlreadyScheduled
        );

        cache.release_marker(key).await;
        assert_eq!(
            cache.try_acquire_marker(key, Duration::from_secs(60)).await,
            MarkerState::Acquired
        );
    }

    #[tokio::test]
    async fn expired_entries_read_as_miss() {
        let cache = test_cache();
        let bounds = sydney_viewport();
        cache
            .set_map(&bounds, 12, None, &json!({"x": 1}), Duration::from_millis(10))
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get_map(&bounds, 12, None).await.is_none());
    }

    #[tokio::test]
    async fn stats_track_hits_and_misses() {
        let cache = test_cache();
        let bounds = sydney_viewport();
        cache.get_map(&bounds, 12, None).await; // miss
        cache
            .set_map(&bounds, 12, None, &json!({}), Duration::from_secs(60))
            .await;
        cache.get_map(&bounds, 12, None).await; // hit

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.backend, "memory");
    }
}
