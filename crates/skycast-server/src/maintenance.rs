//! Periodic cache maintenance

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::AppState;

/// Runs the scheduled clear, drops stale entries and writes the snapshot
pub struct Maintenance {
    state: Arc<AppState>,
    interval: Duration,
    snapshot: Option<PathBuf>,
}

impl Maintenance {
    pub fn new(state: Arc<AppState>, interval: Duration, snapshot: Option<PathBuf>) -> Self {
        Self {
            state,
            interval: interval.max(Duration::from_secs(1)),
            snapshot,
        }
    }

    /// One maintenance pass at the given instants.
    ///
    /// The snapshot is encoded under the cache lock and written after it
    /// is released, so requests never wait on the disk.
    pub async fn tick_at(&self, local_now: NaiveDateTime, now: DateTime<Utc>) -> Result<()> {
        let snapshot = {
            let mut cache = self.state.cache().lock().await;
            cache.maybe_clear(local_now);
            cache.purge_expired(now);
            match &self.snapshot {
                Some(_) => Some(cache.to_snapshot().context("Failed to encode cache snapshot")?),
                None => None,
            }
        };

        if let (Some(path), Some(bytes)) = (&self.snapshot, snapshot) {
            write_snapshot(path, &bytes)
                .await
                .with_context(|| format!("Failed to write cache snapshot {}", path.display()))?;
        }
        Ok(())
    }

    pub async fn tick(&self) -> Result<()> {
        self.tick_at(Local::now().naive_local(), Utc::now()).await
    }

    /// Run forever on the configured interval
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "cache maintenance started");
            let mut ticker = tokio::time::interval(self.interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.tick().await {
                    // keep running, the next pass may succeed
                    error!(error = ?e, "cache maintenance failed");
                }
            }
        })
    }
}

async fn write_snapshot(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "cache snapshot saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_app;
    use chrono::{NaiveDate, TimeZone};
    use crate::CachedForecast;
    use skycast_cache::{CoordKey, ForecastCache};
    use skycast_core::ForecastPipeline;
    use skycast_ingest::{Coord, FileSource, Forecast};

    fn entry(name: &str) -> CachedForecast {
        CachedForecast {
            forecast: Forecast {
                coord: Coord::new(1.0, 2.0).unwrap(),
                timezone: None,
                samples: vec![],
            },
            location_name: Some(name.to_string()),
        }
    }

    fn state() -> Arc<AppState> {
        let (_, state) = build_app(
            Arc::new(FileSource::new("unused.json")),
            None,
            ForecastPipeline::default(),
            ForecastCache::new(3600, vec![12]),
        )
        .unwrap();
        state
    }

    #[tokio::test]
    async fn clears_purges_and_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("state").join("cache.json");
        let state = state();
        let t0 = Utc.with_ymd_and_hms(2024, 11, 1, 9, 0, 0).unwrap();
        {
            let mut cache = state.cache().lock().await;
            cache.insert(CoordKey::new(1.0, 2.0), entry("fresh"), t0);
            cache.insert(CoordKey::new(3.0, 4.0), entry("stale"), t0 - chrono::Duration::hours(2));
        }

        let job = Maintenance::new(state.clone(), Duration::from_secs(60), Some(snapshot.clone()));
        let morning = NaiveDate::from_ymd_opt(2024, 11, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        job.tick_at(morning, t0).await.unwrap();
        assert_eq!(state.cache().lock().await.len(), 1);

        // written after the lock is released, parent directory created
        let reloaded: ForecastCache<CachedForecast> =
            ForecastCache::load(&snapshot, 3600, vec![12]).unwrap();
        assert_eq!(reloaded.len(), 1);
        let kept = reloaded.get(&CoordKey::new(1.0, 2.0), t0).unwrap();
        assert_eq!(kept.location_name.as_deref(), Some("fresh"));
        // the cache stays usable while nothing holds the lock
        assert!(state.cache().try_lock().is_ok());

        let noon = morning + chrono::Duration::hours(3);
        job.tick_at(noon, t0).await.unwrap();
        assert!(state.cache().lock().await.is_empty());
    }
}
