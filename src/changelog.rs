//! Session-scoped audit trail of confirmed changes.

use std::io;
use std::path::Path;

use tracing::info;

use crate::error::{InventoryError, Result};
use crate::update::LocationUpdate;

/// Column headers of the CSV export, in order.
pub const EXPORT_HEADERS: [&str; 5] = [
  "Timestamp",
  "Plate",
  "Previous location",
  "New location",
  "Operator",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One confirmed change as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogEntry {
  timestamp: String,
  plate: String,
  previous: String,
  new_value: String,
  actor: String,
}

impl ChangeLogEntry {
  pub fn timestamp(&self) -> &str {
    &self.timestamp
  }

  pub fn plate(&self) -> &str {
    &self.plate
  }

  pub fn previous(&self) -> &str {
    &self.previous
  }

  pub fn new_value(&self) -> &str {
    &self.new_value
  }

  pub fn actor(&self) -> &str {
    &self.actor
  }

  fn as_row(&self) -> [&str; 5] {
    [
      &self.timestamp,
      &self.plate,
      &self.previous,
      &self.new_value,
      &self.actor,
    ]
  }
}

impl From<&LocationUpdate> for ChangeLogEntry {
  fn from(update: &LocationUpdate) -> Self {
    Self {
      timestamp: update.at.format(TIMESTAMP_FORMAT).to_string(),
      plate: update.plate.clone(),
      previous: update.previous.clone(),
      new_value: update.new_value.clone(),
      actor: update.actor.clone(),
    }
  }
}

/// Append-only list of entries. Entries are never changed or removed.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
  entries: Vec<ChangeLogEntry>,
}

impl ChangeLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn append(&mut self, entry: ChangeLogEntry) {
    self.entries.push(entry);
  }

  /// Entries in insertion order.
  pub fn entries(&self) -> &[ChangeLogEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Write the log as CSV: header row, then one row per entry.
  pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv
      .write_record(EXPORT_HEADERS)
      .map_err(|e| InventoryError::Export(e.to_string()))?;
    for entry in &self.entries {
      csv
        .write_record(entry.as_row())
        .map_err(|e| InventoryError::Export(e.to_string()))?;
    }
    csv
      .flush()
      .map_err(|e| InventoryError::Export(e.to_string()))?;
    Ok(())
  }

  /// Export the log to a file.
  pub fn export_to(&self, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
      .map_err(|e| InventoryError::Export(format!("{}: {}", path.display(), e)))?;
    self.write_csv(file)?;
    info!(path = %path.display(), entries = self.len(), "exported change log");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::CanonicalField;
  use chrono::{Local, TimeZone};

  fn update(plate: &str, previous: &str, new_value: &str) -> LocationUpdate {
    LocationUpdate {
      record_id: "rec1".into(),
      plate: plate.into(),
      field: CanonicalField::Location,
      previous: previous.into(),
      new_value: new_value.into(),
      actor: "Alice".into(),
      at: Local.with_ymd_and_hms(2024, 5, 2, 9, 5, 7).unwrap(),
    }
  }

  #[test]
  fn test_append_keeps_order_and_duplicates() {
    let mut log = ChangeLog::new();
    assert!(log.is_empty());

    let first = ChangeLogEntry::from(&update("ABC123", "Patio 1", "Bodega 2"));
    log.append(first.clone());
    log.append(ChangeLogEntry::from(&update("DEF456", "", "Patio 1")));
    log.append(first.clone());

    assert_eq!(log.len(), 3);
    assert_eq!(log.entries()[0], first);
    assert_eq!(log.entries()[1].plate(), "DEF456");
    assert_eq!(log.entries()[2], first);
    assert_eq!(first.timestamp(), "2024-05-02 09:05:07");
  }

  #[test]
  fn test_csv_export_preserves_insertion_order() {
    let mut log = ChangeLog::new();
    log.append(ChangeLogEntry::from(&update("ABC123", "Patio 1", "Warehouse 2")));
    log.append(ChangeLogEntry::from(&update("DEF456", "", "Patio, Norte")));

    let mut out = Vec::new();
    log.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(
      text,
      "Timestamp,Plate,Previous location,New location,Operator\n\
       2024-05-02 09:05:07,ABC123,Patio 1,Warehouse 2,Alice\n\
       2024-05-02 09:05:07,DEF456,,\"Patio, Norte\",Alice\n"
    );
  }

  #[test]
  fn test_empty_export_has_header_only() {
    let mut out = Vec::new();
    ChangeLog::new().write_csv(&mut out).unwrap();
    assert_eq!(
      String::from_utf8(out).unwrap(),
      "Timestamp,Plate,Previous location,New location,Operator\n"
    );
  }

  #[test]
  fn test_export_to_file() {
    let path = std::env::temp_dir().join(format!("yardloc-log-{}.csv", std::process::id()));
    let mut log = ChangeLog::new();
    log.append(ChangeLogEntry::from(&update("ABC123", "Patio 1", "Yard 3")));

    log.export_to(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);

    std::fs::remove_file(&path).ok();
  }
}
