//! Coordinate-keyed forecast cache
//!
//! Entries expire after a TTL. On top of that the whole cache is dropped
//! at a few fixed local hours, so every location picks up the new model
//! run. A JSON snapshot lets a restart keep what was already fetched.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_TTL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_CLEAR_HOURS: [u32; 3] = [0, 12, 18];

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Cache key: coordinates rounded to two decimals (about 1 km)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoordKey(String);

impl CoordKey {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self(format!("{:.2},{:.2}", round2(latitude), round2(longitude)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// keeps -0.001 and 0.001 on the same key
fn round2(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

impl fmt::Display for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry<T> {
    key: CoordKey,
    stored_at: DateTime<Utc>,
    value: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot<T> {
    entries: Vec<Entry<T>>,
    /// Date and hour of the last scheduled clear, so a restart inside
    /// that hour does not clear a second time
    #[serde(default)]
    last_clear: Option<(NaiveDate, u32)>,
}

#[derive(Debug)]
pub struct ForecastCache<T> {
    entries: HashMap<CoordKey, Entry<T>>,
    ttl_secs: i64,
    clear_hours: Vec<u32>,
    last_clear: Option<(NaiveDate, u32)>,
}

impl<T> Default for ForecastCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS, DEFAULT_CLEAR_HOURS.to_vec())
    }
}

impl<T> ForecastCache<T> {
    pub fn new(ttl_secs: u64, clear_hours: Vec<u32>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            clear_hours,
            last_clear: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - stored_at).num_seconds() < self.ttl_secs
    }

    /// Value stored for `key`, if it is younger than the TTL
    pub fn get(&self, key: &CoordKey, now: DateTime<Utc>) -> Option<&T> {
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry.stored_at, now))
            .map(|entry| &entry.value)
    }

    pub fn insert(&mut self, key: CoordKey, value: T, now: DateTime<Utc>) {
        self.entries.insert(
            key.clone(),
            Entry {
                key,
                stored_at: now,
                value,
            },
        );
    }

    /// Drop stale entries; returns how many went
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl_secs;
        self.entries
            .retain(|_, entry| (now - entry.stored_at).num_seconds() < ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "purged expired forecasts");
        }
        removed
    }

    /// Clear everything when `local_now` falls in a clear hour that has not
    /// been handled yet for its date. Returns whether a clear happened.
    pub fn maybe_clear(&mut self, local_now: NaiveDateTime) -> bool {
        let hour = local_now.hour();
        if !self.clear_hours.contains(&hour) {
            return false;
        }
        let slot = (local_now.date(), hour);
        if self.last_clear == Some(slot) {
            return false;
        }
        let dropped = self.entries.len();
        self.entries.clear();
        self.last_clear = Some(slot);
        info!(hour, dropped, "scheduled cache clear");
        true
    }
}

impl<T: Serialize + Clone> ForecastCache<T> {
    /// Encode every entry, plus the clear bookkeeping, as a JSON snapshot
    pub fn to_snapshot(&self) -> CacheResult<Vec<u8>> {
        let mut entries: Vec<Entry<T>> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        let snapshot = Snapshot {
            entries,
            last_clear: self.last_clear,
        };
        Ok(serde_json::to_vec(&snapshot)?)
    }

    /// Write the snapshot to `path`, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CacheResult<()> {
        let path = path.as_ref();
        let bytes = self.to_snapshot()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        debug!(path = %path.display(), entries = self.entries.len(), "cache snapshot saved");
        Ok(())
    }
}

impl<T: DeserializeOwned> ForecastCache<T> {
    /// Read a snapshot written by [`ForecastCache::save`]; a missing file gives an empty cache
    pub fn load<P: AsRef<Path>>(path: P, ttl_secs: u64, clear_hours: Vec<u32>) -> CacheResult<Self> {
        let path = path.as_ref();
        let mut cache = Self::new(ttl_secs, clear_hours);
        if !path.exists() {
            debug!(path = %path.display(), "no cache snapshot");
            return Ok(cache);
        }
        let bytes = fs::read(path)?;
        let snapshot: Snapshot<T> = serde_json::from_slice(&bytes)?;
        for entry in snapshot.entries {
            cache.entries.insert(entry.key.clone(), entry);
        }
        cache.last_clear = snapshot.last_clear;
        info!(path = %path.display(), entries = cache.len(), "cache snapshot loaded");
        Ok(cache)
    }
}
