use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use moka::{future::Cache, Expiry};

use crate::models::{garden::Garden, layout::Layout, params::OptimizationParams, plant::Plant};

pub const DEFAULT_LAYOUT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

/// Identity of a computed layout: the garden plus a fingerprint of every
/// input that can change the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    pub garden_id: String,
    pub fingerprint: u64,
}

fn hash_plant<H: Hasher>(plant: &Plant, state: &mut H) {
    plant.id.hash(state);
    plant.plant_type.hash(state);
    plant.spacing_requirement.map(f64::to_bits).hash(state);
    plant.sunlight_needs.hash(state);
    plant.growth_stage.hash(state);
    plant.companion_plants.hash(state);
    plant.incompatible_plants.hash(state);
}

impl LayoutKey {
    /// Zones are hashed in garden order (it drives claim priority); plants
    /// are hashed sorted by id, so caller ordering does not matter.
    pub fn new(garden: &Garden, plants: &[Plant], params: &OptimizationParams) -> Self {
        let mut hasher = DefaultHasher::new();
        garden.total_area.to_bits().hash(&mut hasher);
        for zone in &garden.zones {
            zone.id.hash(&mut hasher);
            zone.area.to_bits().hash(&mut hasher);
            zone.sunlight_condition.hash(&mut hasher);
        }
        let mut sorted: Vec<&Plant> = plants.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));
        for plant in sorted {
            hash_plant(plant, &mut hasher);
        }
        params.hash_result_inputs(&mut hasher);
        Self {
            garden_id: garden.id.clone(),
            fingerprint: hasher.finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub layout: Arc<Layout>,
    pub expires_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn new(layout: Layout, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            layout: Arc::new(layout),
            expires_at,
            ttl,
        }
    }
}

/// Each entry lives for the TTL it was created with.
struct PerEntryTtl;

impl Expiry<LayoutKey, CacheEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &LayoutKey,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Memoizes layouts per [`LayoutKey`].
///
/// Concurrent requests for a missing key share one computation; the others
/// wait for its result. Expired entries read as absent and are recomputed on
/// the next request. A failed computation is handed to every waiter and
/// leaves nothing behind, so the next request computes again.
#[derive(Clone)]
pub struct LayoutCache {
    entries: Cache<LayoutKey, CacheEntry>,
    default_ttl: Duration,
}

impl LayoutCache {
    pub fn new(capacity: u64, default_ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .expire_after(PerEntryTtl)
            .support_invalidation_closures()
            .build();
        Self {
            entries,
            default_ttl,
        }
    }

    /// Returns the cached layout for `key`, or runs `compute` to produce it.
    /// `ttl` falls back to the cache default.
    pub async fn get_or_compute<F, E>(
        &self,
        key: LayoutKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Arc<Layout>, Arc<E>>
    where
        F: Future<Output = Result<Layout, E>>,
        E: Send + Sync + 'static,
    {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = self
            .entries
            .entry(key)
            .or_try_insert_with(async move {
                let layout = compute.await?;
                Ok::<_, E>(CacheEntry::new(layout, ttl))
            })
            .await?;
        if entry.is_fresh() {
            debug!("layout cache miss for garden '{}'", entry.key().garden_id);
        } else {
            debug!("layout cache hit for garden '{}'", entry.key().garden_id);
        }
        Ok(entry.into_value().layout)
    }

    pub async fn get(&self, key: &LayoutKey) -> Option<Arc<Layout>> {
        self.entries.get(key).await.map(|entry| entry.layout)
    }

    pub async fn invalidate(&self, key: &LayoutKey) {
        self.entries.invalidate(key).await;
    }

    /// Drops every layout cached for `garden_id`.
    pub fn invalidate_garden(&self, garden_id: &str) {
        let garden_id = garden_id.to_string();
        if let Err(e) = self
            .entries
            .invalidate_entries_if(move |key, _| key.garden_id == garden_id)
        {
            warn!("layout cache invalidation rejected: {e}");
        }
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_LAYOUT_TTL)
    }
}
