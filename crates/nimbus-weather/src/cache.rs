//! Single-slot forecast cache.
//!
//! Persistence is an injected [`CacheStore`] so the orchestrator can run
//! against a JSON file on disk or an in-memory map in tests. [`WeatherCache`]
//! layers the `(place, data, ts)` record and the freshness rule on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::types::{CacheEntry, ForecastSnapshot, Place, WeatherError};

/// Key under which the last successful forecast is stored
pub const CACHE_KEY: &str = "nimbus.weather.last";

/// Minimal key-value persistence
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, WeatherError>;
    fn set(&self, key: &str, value: &str) -> Result<(), WeatherError>;
    fn clear(&self, key: &str) -> Result<(), WeatherError>;
}

/// One JSON file per key inside a directory
#[derive(Debug)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, WeatherError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WeatherError::Cache(format!("read {key}: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), WeatherError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| WeatherError::Cache(format!("create {}: {e}", self.dir.display())))?;

        // Write-then-rename so a crash never leaves a half-written record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .map_err(|e| WeatherError::Cache(format!("write {key}: {e}")))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| WeatherError::Cache(format!("replace {key}: {e}")))
    }

    fn clear(&self, key: &str) -> Result<(), WeatherError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WeatherError::Cache(format!("remove {key}: {e}"))),
        }
    }
}

/// In-process store, used by tests and by callers that opt out of persistence
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, WeatherError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), WeatherError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), WeatherError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Outcome of a startup cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Young enough to render immediately
    Fresh(CacheEntry),
    /// Present but too old to show
    Stale(CacheEntry),
    Missing,
}

#[derive(Clone)]
pub struct WeatherCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl std::fmt::Debug for WeatherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCache").field("ttl", &self.ttl).finish()
    }
}

impl WeatherCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Read the stored entry. An unreadable record is reported as missing.
    pub fn load(&self) -> Option<CacheEntry> {
        let raw = match self.store.get(CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read forecast cache");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable forecast cache");
                None
            }
        }
    }

    pub fn lookup(&self, now: DateTime<Utc>) -> CacheLookup {
        match self.load() {
            Some(entry) if entry.is_fresh(now, self.ttl) => CacheLookup::Fresh(entry),
            Some(entry) => CacheLookup::Stale(entry),
            None => CacheLookup::Missing,
        }
    }

    /// Overwrite the slot with a new `(place, data)` pair captured at `now`.
    pub fn store(
        &self,
        place: &Place,
        data: &ForecastSnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), WeatherError> {
        let entry = CacheEntry {
            place: place.clone(),
            data: data.clone(),
            captured_at: now,
        };
        let raw = serde_json::to_string(&entry)
            .map_err(|e| WeatherError::Cache(format!("serialize entry: {e}")))?;
        self.store.set(CACHE_KEY, &raw)?;
        tracing::debug!(place = %place.name(), "Forecast cache updated");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), WeatherError> {
        self.store.clear(CACHE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const TTL: Duration = Duration::from_secs(30 * 60);

    fn paris() -> Place {
        Place::new("Paris, Île-de-France, France", 48.85, 2.35, "Europe/Paris").unwrap()
    }

    fn memory_cache() -> WeatherCache {
        WeatherCache::new(Arc::new(MemoryCacheStore::new()), TTL)
    }

    #[test]
    fn test_missing_when_empty() {
        assert_eq!(memory_cache().lookup(Utc::now()), CacheLookup::Missing);
    }

    #[test]
    fn test_29_minutes_is_fresh() {
        let cache = memory_cache();
        let now = Utc::now();
        cache
            .store(&paris(), &ForecastSnapshot::default(), now - ChronoDuration::minutes(29))
            .unwrap();
        assert!(matches!(cache.lookup(now), CacheLookup::Fresh(_)));
    }

    #[test]
    fn test_31_minutes_is_stale() {
        let cache = memory_cache();
        let now = Utc::now();
        cache
            .store(&paris(), &ForecastSnapshot::default(), now - ChronoDuration::minutes(31))
            .unwrap();
        assert!(matches!(cache.lookup(now), CacheLookup::Stale(_)));
    }

    #[test]
    fn test_exactly_ttl_is_stale() {
        let cache = memory_cache();
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        cache
            .store(&paris(), &ForecastSnapshot::default(), now - ChronoDuration::minutes(30))
            .unwrap();
        assert!(matches!(cache.lookup(now), CacheLookup::Stale(_)));
    }

    #[test]
    fn test_store_overwrites_single_slot() {
        let cache = memory_cache();
        let now = Utc::now();
        cache.store(&paris(), &ForecastSnapshot::default(), now).unwrap();
        let tokyo = Place::new("Tokyo, Japan", 35.68, 139.69, "Asia/Tokyo").unwrap();
        cache.store(&tokyo, &ForecastSnapshot::default(), now).unwrap();

        let entry = cache.load().unwrap();
        assert_eq!(entry.place.name(), "Tokyo, Japan");
    }

    #[test]
    fn test_corrupt_record_is_missing() {
        let store = Arc::new(MemoryCacheStore::new());
        store.set(CACHE_KEY, "{not json").unwrap();
        let cache = WeatherCache::new(store, TTL);
        assert_eq!(cache.lookup(Utc::now()), CacheLookup::Missing);
    }

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileCacheStore::new(&dir.path().join("cache")));
        let cache = WeatherCache::new(store.clone(), TTL);
        let now = Utc::now();

        cache.store(&paris(), &ForecastSnapshot::default(), now).unwrap();
        assert!(dir.path().join("cache").join(format!("{CACHE_KEY}.json")).exists());
        assert!(matches!(cache.lookup(now), CacheLookup::Fresh(_)));

        cache.clear().unwrap();
        assert_eq!(store.get(CACHE_KEY).unwrap(), None);
        // Clearing twice is fine
        cache.clear().unwrap();
    }
}
