//! TTL cache over a full fetch of the inventory table.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::traits::CacheResult;
use crate::error::{InventoryError, Result};
use crate::remote::RemoteTable;
use crate::snapshot::Snapshot;

/// Default time a snapshot stays fresh.
pub const DEFAULT_TTL_SECS: i64 = 30;

/// Holds the last captured snapshot and decides when to refetch.
///
/// Within the TTL, `load` returns the held snapshot without touching the
/// network. A failed fetch leaves the held snapshot in place.
#[derive(Debug, Clone)]
pub struct DataCache {
  snapshot: Option<Arc<Snapshot>>,
  /// How long before cached data is considered stale
  ttl: Duration,
  invalidated: bool,
}

impl Default for DataCache {
  fn default() -> Self {
    Self::new(Duration::seconds(DEFAULT_TTL_SECS))
  }
}

impl DataCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      snapshot: None,
      ttl,
      invalidated: false,
    }
  }

  /// The held snapshot, fresh or not.
  pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
    self.snapshot.as_ref()
  }

  /// Age of the held snapshot at `now`.
  pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
    self.snapshot.as_ref().map(|s| now - s.captured_at())
  }

  /// Whether the next load at `now` would hit the remote store.
  pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
    if self.invalidated {
      return true;
    }
    match self.age_at(now) {
      Some(age) => age >= self.ttl,
      None => true,
    }
  }

  /// Load the snapshot, fetching only when forced, invalidated or stale.
  pub async fn load<R: RemoteTable>(
    &mut self,
    remote: &R,
    force: bool,
  ) -> Result<CacheResult<Arc<Snapshot>>> {
    self.load_at(remote, force, Utc::now()).await
  }

  /// [`DataCache::load`] with an explicit clock.
  pub async fn load_at<R: RemoteTable>(
    &mut self,
    remote: &R,
    force: bool,
    now: DateTime<Utc>,
  ) -> Result<CacheResult<Arc<Snapshot>>> {
    if !force && !self.is_stale_at(now) {
      if let Some(snapshot) = &self.snapshot {
        debug!(records = snapshot.len(), "serving cached snapshot");
        return Ok(CacheResult::from_cache(
          Arc::clone(snapshot),
          snapshot.captured_at(),
        ));
      }
    }

    let dataset = remote.fetch_all().await.map_err(|e| {
      warn!(error = %e, "fetch failed, keeping previous snapshot");
      InventoryError::Fetch(e.to_string())
    })?;

    let snapshot = Arc::new(Snapshot::capture(dataset, now));
    info!(
      records = snapshot.len(),
      location = snapshot.schema().location_header().unwrap_or("<none>"),
      "captured new snapshot"
    );

    self.snapshot = Some(Arc::clone(&snapshot));
    self.invalidated = false;

    Ok(CacheResult::from_network(snapshot, now))
  }

  /// Force the next load to refetch.
  pub fn invalidate(&mut self) {
    self.invalidated = true;
  }

  /// Drop the held snapshot entirely.
  pub fn clear(&mut self) {
    self.snapshot = None;
    self.invalidated = false;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::remote::memory::MemoryTable;

  fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
  }

  #[tokio::test]
  async fn test_two_loads_within_ttl_fetch_once() {
    let remote = MemoryTable::inventory();
    let mut cache = DataCache::default();

    let first = cache.load_at(&remote, false, at(0)).await.unwrap();
    let second = cache.load_at(&remote, false, at(29)).await.unwrap();

    assert_eq!(remote.fetches(), 1);
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert!(Arc::ptr_eq(&first.data, &second.data));
  }

  #[tokio::test]
  async fn test_load_after_ttl_fetches_again() {
    let remote = MemoryTable::inventory();
    let mut cache = DataCache::default();

    cache.load_at(&remote, false, at(0)).await.unwrap();
    let later = cache.load_at(&remote, false, at(30)).await.unwrap();

    assert_eq!(remote.fetches(), 2);
    assert_eq!(later.source, CacheSource::Network);
    assert_eq!(later.cached_at, at(30));
  }

  #[tokio::test]
  async fn test_invalidate_and_force_refetch_once() {
    let remote = MemoryTable::inventory();
    let mut cache = DataCache::default();

    cache.load_at(&remote, false, at(0)).await.unwrap();
    cache.invalidate();
    cache.load_at(&remote, false, at(1)).await.unwrap();
    cache.load_at(&remote, false, at(2)).await.unwrap();
    assert_eq!(remote.fetches(), 2);

    cache.load_at(&remote, true, at(3)).await.unwrap();
    assert_eq!(remote.fetches(), 3);
  }

  #[tokio::test]
  async fn test_failed_fetch_keeps_previous_snapshot() {
    let remote = MemoryTable::inventory();
    let mut cache = DataCache::default();

    let first = cache.load_at(&remote, false, at(0)).await.unwrap();
    remote.set_fail_fetch(true);

    let err = cache.load_at(&remote, true, at(5)).await.unwrap_err();
    assert!(matches!(err, InventoryError::Fetch(_)));

    let held = cache.snapshot().unwrap();
    assert!(Arc::ptr_eq(held, &first.data));
    assert_eq!(cache.age_at(at(5)), Some(Duration::seconds(5)));
  }

  #[tokio::test]
  async fn test_failed_fetch_keeps_invalidation() {
    let remote = MemoryTable::inventory();
    let mut cache = DataCache::default();

    cache.load_at(&remote, false, at(0)).await.unwrap();
    cache.invalidate();
    remote.set_fail_fetch(true);
    assert!(cache.load_at(&remote, false, at(1)).await.is_err());

    remote.set_fail_fetch(false);
    cache.load_at(&remote, false, at(2)).await.unwrap();
    assert_eq!(remote.fetches(), 3);
  }

  #[tokio::test]
  async fn test_clear_drops_snapshot() {
    let remote = MemoryTable::inventory();
    let mut cache = DataCache::new(Duration::seconds(60));

    cache.load_at(&remote, false, at(0)).await.unwrap();
    cache.clear();
    assert!(cache.snapshot().is_none());
    assert!(cache.is_stale_at(at(1)));
  }
}
