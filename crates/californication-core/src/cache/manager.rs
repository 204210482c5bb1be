use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::Place;

/// Cache name of the persisted place list
const PLACES_CACHE: &str = "places";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Persists the place list between runs.
///
/// Saves replace the stored list entirely. Loads never fail: a missing or
/// unreadable file is reported as `None`.
pub struct CacheManager {
    cache_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self {
            cache_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    /// Write to a sibling temp file and rename over the target so a reader
    /// never observes a half-written cache.
    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        let path = self.cache_path(name);
        let tmp_path = self.cache_dir.join(format!("{}.json.tmp", name));

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Cache write lock poisoned"))?;
        std::fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace cache file: {}", name))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.cache_path(name);
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Cache write lock poisoned"))?;
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", name))?;
        }
        Ok(())
    }

    // ===== Places =====

    pub fn save_places(&self, places: &[Place]) -> Result<()> {
        self.save(PLACES_CACHE, &places)?;
        debug!(count = places.len(), "Saved places to cache");
        Ok(())
    }

    /// Last saved list with its timestamp, or `None` on a cache miss.
    pub fn load_cached_places(&self) -> Option<CachedData<Vec<Place>>> {
        match self.load(PLACES_CACHE) {
            Ok(cached) => cached,
            Err(e) => {
                debug!(cache = PLACES_CACHE, error = %e, "Treating unreadable cache as empty");
                None
            }
        }
    }

    pub fn load_places(&self) -> Option<Vec<Place>> {
        self.load_cached_places().map(|cached| cached.data)
    }

    pub fn clear_places(&self) -> Result<()> {
        self.remove(PLACES_CACHE)
    }

    /// Human-readable age of the stored list, e.g. "5m ago".
    pub fn places_age(&self) -> Option<String> {
        self.load_cached_places().map(|cached| cached.age_display())
    }
}

// ============================================================================
// Tests
// ============================================================================
