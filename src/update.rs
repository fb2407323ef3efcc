//! Single-field writes with audit stamping.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local, SecondsFormat};
use tracing::{info, warn};

use crate::cache::DataCache;
use crate::error::{InventoryError, Result};
use crate::remote::RemoteTable;
use crate::schema::CanonicalField;

pub const DEFAULT_MODIFIED_BY_FIELD: &str = "Modificado Por";
pub const DEFAULT_MODIFIED_AT_FIELD: &str = "Fecha Modificacion";

/// One committed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationUpdate {
  pub record_id: String,
  pub plate: String,
  pub field: CanonicalField,
  pub previous: String,
  pub new_value: String,
  pub actor: String,
  pub at: DateTime<Local>,
}

/// Applies one field change to one record and invalidates the cache.
///
/// The coordinator never touches the change log; recording a confirmed change
/// is up to the caller.
#[derive(Debug, Clone)]
pub struct UpdateCoordinator {
  modified_by_field: String,
  modified_at_field: String,
}

impl Default for UpdateCoordinator {
  fn default() -> Self {
    Self::new(DEFAULT_MODIFIED_BY_FIELD, DEFAULT_MODIFIED_AT_FIELD)
  }
}

impl UpdateCoordinator {
  pub fn new(modified_by_field: impl Into<String>, modified_at_field: impl Into<String>) -> Self {
    Self {
      modified_by_field: modified_by_field.into(),
      modified_at_field: modified_at_field.into(),
    }
  }

  /// Set `field` of `record_id` to `new_value` in one remote call, stamped with
  /// `actor` and `at`.
  ///
  /// The record must be in the cache's current snapshot. On success the cache
  /// is invalidated and the previous value, read from that snapshot, is
  /// returned. On failure nothing local changes.
  #[allow(clippy::too_many_arguments)]
  pub async fn apply<R: RemoteTable>(
    &self,
    remote: &R,
    cache: &mut DataCache,
    record_id: &str,
    field: CanonicalField,
    new_value: &str,
    actor: &str,
    at: DateTime<Local>,
  ) -> Result<LocationUpdate> {
    let snapshot = cache
      .snapshot()
      .map(Arc::clone)
      .ok_or_else(|| InventoryError::RecordNotFound(format!("record {}", record_id)))?;

    let record = snapshot
      .record(record_id)
      .ok_or_else(|| InventoryError::RecordNotFound(format!("record {}", record_id)))?;

    let raw_field = snapshot
      .schema()
      .raw_header(field)
      .ok_or_else(|| match field {
        CanonicalField::Location => InventoryError::SchemaResolution,
        other => InventoryError::UnknownField(other),
      })?;

    let new_value = new_value.trim();
    if new_value.is_empty() {
      return Err(InventoryError::EmptyValue);
    }

    let previous = record.value(field).unwrap_or_default().to_string();

    let mut fields = BTreeMap::new();
    fields.insert(raw_field.to_string(), new_value.to_string());
    fields.insert(self.modified_by_field.clone(), actor.to_string());
    fields.insert(
      self.modified_at_field.clone(),
      at.to_rfc3339_opts(SecondsFormat::Secs, false),
    );

    if let Err(e) = remote.update(record_id, &fields).await {
      warn!(record = record_id, %field, error = %e, "update rejected");
      return Err(InventoryError::UpdateWrite(e.to_string()));
    }

    cache.invalidate();
    info!(
      record = record_id,
      plate = record.plate(),
      %field,
      actor,
      "record updated"
    );

    Ok(LocationUpdate {
      record_id: record_id.to_string(),
      plate: record.plate().to_string(),
      field,
      previous,
      new_value: new_value.to_string(),
      actor: actor.to_string(),
      at,
    })
  }
}
