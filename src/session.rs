//! Operator identity and the per-session state threaded through every operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use tracing::{info, warn};

use crate::cache::{CacheResult, CacheSource, DataCache};
use crate::changelog::{ChangeLog, ChangeLogEntry};
use crate::error::{InventoryError, Result};
use crate::remote::RemoteTable;
use crate::schema::CanonicalField;
use crate::snapshot::{Record, Snapshot};
use crate::update::{LocationUpdate, UpdateCoordinator};

/// Allow-list of operator display names, loaded once at start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operators {
  names: Vec<String>,
}

impl Operators {
  /// Blank names are dropped and duplicates collapsed, keeping first occurrence.
  pub fn new<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut list: Vec<String> = Vec::new();
    for name in names {
      let name = name.as_ref().trim();
      if !name.is_empty() && !list.iter().any(|n| n == name) {
        list.push(name.to_string());
      }
    }
    Self { names: list }
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  pub fn contains(&self, name: &str) -> bool {
    self.names.iter().any(|n| n == name)
  }
}

/// A plate lookup, possibly answered from a snapshot that failed to refresh.
#[derive(Debug, Clone)]
pub struct SearchHit {
  pub record: Record,
  /// Set when the refetch failed and the held snapshot was used instead
  pub refresh_error: Option<String>,
}

/// One operator's session: identity, cached snapshot and change log.
///
/// Data operations require a logged-in operator. Logging out drops the
/// snapshot and the change log so the next operator starts clean.
#[derive(Debug, Default)]
pub struct Session {
  operator: Option<String>,
  cache: DataCache,
  log: ChangeLog,
  /// Locations written since the held snapshot was captured, by record id
  confirmed: BTreeMap<String, String>,
}

impl Session {
  pub fn new(ttl: Duration) -> Self {
    Self {
      operator: None,
      cache: DataCache::new(ttl),
      log: ChangeLog::new(),
      confirmed: BTreeMap::new(),
    }
  }

  /// Authenticate as `name`, which must be on the allow-list.
  ///
  /// Logging in while someone else is logged in ends their session first.
  pub fn login(&mut self, operators: &Operators, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() || !operators.contains(name) {
      return Err(InventoryError::UnauthorizedOperator(name.to_string()));
    }

    if self.operator.as_deref() != Some(name) {
      if self.operator.is_some() {
        self.logout();
      }
      info!(operator = name, "operator logged in");
      self.operator = Some(name.to_string());
    }
    Ok(())
  }

  /// Back to unauthenticated, discarding the snapshot and the change log.
  pub fn logout(&mut self) {
    if let Some(operator) = self.operator.take() {
      info!(operator = %operator, changes = self.log.len(), "operator logged out");
    }
    self.cache.clear();
    self.log = ChangeLog::new();
    self.confirmed.clear();
  }

  pub fn operator(&self) -> Option<&str> {
    self.operator.as_deref()
  }

  pub fn is_authenticated(&self) -> bool {
    self.operator.is_some()
  }

  fn require_operator(&self) -> Result<&str> {
    self.operator().ok_or(InventoryError::NotAuthenticated)
  }

  pub fn cache(&self) -> &DataCache {
    &self.cache
  }

  pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
    self.cache.snapshot()
  }

  pub fn change_log(&self) -> &ChangeLog {
    &self.log
  }

  /// Current snapshot, from cache within the TTL or freshly fetched.
  pub async fn load<R: RemoteTable>(
    &mut self,
    remote: &R,
    force: bool,
  ) -> Result<CacheResult<Arc<Snapshot>>> {
    self.require_operator()?;
    let result = self.cache.load(remote, force).await?;
    if result.source == CacheSource::Network {
      self.confirmed.clear();
    }
    Ok(result)
  }

  /// Look up a vehicle by plate in the current snapshot, loading it if stale.
  ///
  /// When the refetch fails but a snapshot is held, the lookup runs against
  /// the held one and the failure is returned alongside the record.
  pub async fn search<R: RemoteTable>(&mut self, remote: &R, plate: &str) -> Result<SearchHit> {
    let (snapshot, refresh_error) = match self.load(remote, false).await {
      Ok(result) => (result.data, None),
      Err(InventoryError::Fetch(msg)) => match self.cache.snapshot() {
        Some(held) => {
          warn!(error = %msg, "searching the held snapshot after a failed refresh");
          (Arc::clone(held), Some(msg))
        }
        None => return Err(InventoryError::Fetch(msg)),
      },
      Err(e) => return Err(e),
    };

    let record = snapshot.find_by_plate(plate)?.clone();
    Ok(SearchHit {
      record,
      refresh_error,
    })
  }

  /// Move a vehicle to `new_location` and record the change once the remote
  /// store has confirmed it.
  ///
  /// The held snapshot predates any write made since it was captured, so the
  /// previous value of a record moved earlier comes from that earlier write.
  pub async fn apply_location<R: RemoteTable>(
    &mut self,
    remote: &R,
    coordinator: &UpdateCoordinator,
    record_id: &str,
    new_location: &str,
    at: DateTime<Local>,
  ) -> Result<LocationUpdate> {
    let actor = self.require_operator()?.to_string();
    let mut update = coordinator
      .apply(
        remote,
        &mut self.cache,
        record_id,
        CanonicalField::Location,
        new_location,
        &actor,
        at,
      )
      .await?;
    if let Some(previous) = self.confirmed.get(record_id) {
      update.previous = previous.clone();
    }
    self
      .confirmed
      .insert(record_id.to_string(), update.new_value.clone());
    self.log.append(ChangeLogEntry::from(&update));
    Ok(update)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::remote::memory::MemoryTable;
  use chrono::TimeZone;

  fn operators() -> Operators {
    Operators::new(["Alice", " Bob ", "", "Alice"])
  }

  fn now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap()
  }

  async fn logged_in(remote: &MemoryTable) -> Session {
    let mut session = Session::default();
    session.login(&operators(), "Alice").unwrap();
    session.load(remote, false).await.unwrap();
    session
  }

  #[test]
  fn test_operator_list_is_cleaned() {
    assert_eq!(operators().names(), &["Alice", "Bob"]);
  }

  #[test]
  fn test_login_requires_listed_name() {
    let mut session = Session::default();
    assert!(matches!(
      session.login(&operators(), ""),
      Err(InventoryError::UnauthorizedOperator(_))
    ));
    assert!(matches!(
      session.login(&operators(), "Mallory"),
      Err(InventoryError::UnauthorizedOperator(_))
    ));
    assert!(!session.is_authenticated());

    session.login(&operators(), " Bob").unwrap();
    assert_eq!(session.operator(), Some("Bob"));
  }

  #[tokio::test]
  async fn test_operations_require_login() {
    let remote = MemoryTable::inventory();
    let mut session = Session::default();

    let err = session.load(&remote, false).await.unwrap_err();
    assert!(matches!(err, InventoryError::NotAuthenticated));
    let err = session
      .apply_location(&remote, &UpdateCoordinator::default(), "rec1", "Yard 3", now())
      .await
      .unwrap_err();
    assert!(matches!(err, InventoryError::NotAuthenticated));
    assert_eq!(remote.fetches(), 0);
    assert_eq!(remote.updates(), 0);
  }

  #[tokio::test]
  async fn test_scenario_search_and_apply() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;
    let coordinator = UpdateCoordinator::default();

    assert_eq!(
      session.snapshot().unwrap().schema().location_header(),
      Some("Physical Location")
    );

    let missing = session.search(&remote, "XYZ999").await.unwrap_err();
    assert!(matches!(missing, InventoryError::RecordNotFound(_)));

    let hit = session.search(&remote, "abc123").await.unwrap();
    assert!(hit.refresh_error.is_none());
    let record = hit.record;
    assert_eq!(record.location(), Some("Patio 1"));

    session
      .apply_location(&remote, &coordinator, record.id(), "Warehouse 2", now())
      .await
      .unwrap();

    let entries = session.change_log().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].plate(), "ABC123");
    assert_eq!(entries[0].previous(), "Patio 1");
    assert_eq!(entries[0].new_value(), "Warehouse 2");
    assert_eq!(entries[0].actor(), "Alice");
  }

  #[tokio::test]
  async fn test_apply_then_forced_load_shows_new_location() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;

    session
      .apply_location(&remote, &UpdateCoordinator::default(), "rec3", "Yard 3", now())
      .await
      .unwrap();

    let snapshot = session.load(&remote, true).await.unwrap().data;
    assert_eq!(
      snapshot.record("rec3").and_then(|r| r.location()),
      Some("Yard 3")
    );
    assert_eq!(session.change_log().entries()[0].previous(), "");
  }

  #[tokio::test]
  async fn test_failures_leave_log_untouched() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;
    let coordinator = UpdateCoordinator::default();

    let err = session
      .apply_location(&remote, &coordinator, "recX", "Yard 3", now())
      .await
      .unwrap_err();
    assert!(matches!(err, InventoryError::RecordNotFound(_)));

    remote.set_fail_update(true);
    let err = session
      .apply_location(&remote, &coordinator, "rec1", "Yard 3", now())
      .await
      .unwrap_err();
    assert!(matches!(err, InventoryError::UpdateWrite(_)));

    assert!(session.change_log().is_empty());
  }

  #[tokio::test]
  async fn test_lookup_works_without_location_column() {
    let remote = MemoryTable::new(&["Placa", "Marca"], &[("rec1", &["ABC123", "Mazda"])]);
    let mut session = logged_in(&remote).await;

    assert!(!session.snapshot().unwrap().schema().has_location());
    let record = session.search(&remote, "ABC123").await.unwrap().record;
    assert_eq!(record.value(CanonicalField::Brand), Some("Mazda"));
  }

  #[tokio::test]
  async fn test_logout_discards_snapshot_and_log() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;
    session
      .apply_location(&remote, &UpdateCoordinator::default(), "rec1", "Yard 3", now())
      .await
      .unwrap();

    session.logout();
    assert!(!session.is_authenticated());
    assert!(session.snapshot().is_none());
    assert!(session.change_log().is_empty());
  }

  #[tokio::test]
  async fn test_switching_operator_starts_clean() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;
    session
      .apply_location(&remote, &UpdateCoordinator::default(), "rec1", "Yard 3", now())
      .await
      .unwrap();

    session.login(&operators(), "Alice").unwrap();
    assert_eq!(session.change_log().len(), 1);

    session.login(&operators(), "Bob").unwrap();
    assert_eq!(session.operator(), Some("Bob"));
    assert!(session.change_log().is_empty());
    assert!(session.snapshot().is_none());
  }

  #[tokio::test]
  async fn test_second_apply_records_first_write_as_previous() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;
    let coordinator = UpdateCoordinator::default();

    session
      .apply_location(&remote, &coordinator, "rec1", "Bodega 2", now())
      .await
      .unwrap();
    let second = session
      .apply_location(&remote, &coordinator, "rec1", "Yard 3", now())
      .await
      .unwrap();

    assert_eq!(second.previous, "Bodega 2");
    let entries = session.change_log().entries();
    assert_eq!(entries[0].previous(), "Patio 1");
    assert_eq!(entries[0].new_value(), "Bodega 2");
    assert_eq!(entries[1].previous(), "Bodega 2");
    assert_eq!(entries[1].new_value(), "Yard 3");
    assert_eq!(
      remote.field("rec1", "Physical Location").as_deref(),
      Some("Yard 3")
    );
  }

  #[tokio::test]
  async fn test_refetch_forgets_earlier_writes() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;
    let coordinator = UpdateCoordinator::default();

    session
      .apply_location(&remote, &coordinator, "rec2", "Yard 3", now())
      .await
      .unwrap();
    session.load(&remote, false).await.unwrap();
    let update = session
      .apply_location(&remote, &coordinator, "rec2", "Patio 1", now())
      .await
      .unwrap();

    assert_eq!(remote.fetches(), 2);
    assert_eq!(update.previous, "Yard 3");
  }

  #[tokio::test]
  async fn test_search_uses_held_snapshot_when_refresh_fails() {
    let remote = MemoryTable::inventory();
    let mut session = logged_in(&remote).await;
    session
      .apply_location(&remote, &UpdateCoordinator::default(), "rec2", "Yard 3", now())
      .await
      .unwrap();
    remote.set_fail_fetch(true);

    let hit = session.search(&remote, "ABC123").await.unwrap();
    assert_eq!(hit.record.location(), Some("Patio 1"));
    assert!(hit
      .refresh_error
      .as_deref()
      .is_some_and(|e| e.contains("connection refused")));

    let missing = session.search(&remote, "XYZ999").await.unwrap_err();
    assert!(matches!(missing, InventoryError::RecordNotFound(_)));
    assert_eq!(remote.fetches(), 3);
  }

  #[tokio::test]
  async fn test_search_without_snapshot_reports_fetch_failure() {
    let remote = MemoryTable::inventory();
    let mut session = Session::default();
    session.login(&operators(), "Alice").unwrap();
    remote.set_fail_fetch(true);

    let err = session.search(&remote, "ABC123").await.unwrap_err();
    assert!(matches!(err, InventoryError::Fetch(_)));
  }
}
