//! Immutable captures of the inventory table.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::error::{InventoryError, Result};
use crate::remote::RemoteDataset;
use crate::schema::{CanonicalField, ResolvedSchema};

/// Normalize a plate for lookup: trimmed and uppercased.
pub fn normalize_plate(plate: &str) -> String {
  plate.trim().to_uppercase()
}

/// One vehicle row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  id: String,
  plate: String,
  values: BTreeMap<CanonicalField, String>,
  raw: BTreeMap<String, String>,
}

impl Record {
  fn from_fields(id: String, raw: BTreeMap<String, String>, schema: &ResolvedSchema) -> Self {
    let values: BTreeMap<CanonicalField, String> = CanonicalField::ALL
      .iter()
      .filter_map(|field| {
        let header = schema.raw_header(*field)?;
        let value = raw.get(header)?.trim();
        (!value.is_empty()).then(|| (*field, value.to_string()))
      })
      .collect();

    let plate = values
      .get(&CanonicalField::Plate)
      .map(|p| normalize_plate(p))
      .unwrap_or_default();

    Self {
      id,
      plate,
      values,
      raw,
    }
  }

  /// Identifier assigned by the remote store.
  pub fn id(&self) -> &str {
    &self.id
  }

  /// Normalized plate, empty when the row has none.
  pub fn plate(&self) -> &str {
    &self.plate
  }

  /// Non-empty value of a canonical field.
  pub fn value(&self, field: CanonicalField) -> Option<&str> {
    self.values.get(&field).map(String::as_str)
  }

  pub fn location(&self) -> Option<&str> {
    self.value(CanonicalField::Location)
  }

  /// Value of a raw column, as fetched.
  pub fn raw(&self, header: &str) -> Option<&str> {
    self.raw.get(header).map(String::as_str)
  }
}

/// One fetch of the table together with its resolved schema.
#[derive(Debug, Clone)]
pub struct Snapshot {
  records: Vec<Record>,
  headers: Vec<String>,
  id_header: Option<String>,
  schema: ResolvedSchema,
  captured_at: DateTime<Utc>,
}

impl Snapshot {
  pub fn capture(dataset: RemoteDataset, captured_at: DateTime<Utc>) -> Self {
    let schema = ResolvedSchema::resolve(dataset.headers.as_slice());
    let records = dataset
      .records
      .into_iter()
      .map(|r| Record::from_fields(r.id, r.fields, &schema))
      .collect();

    Self {
      records,
      headers: dataset.headers,
      id_header: dataset.id_header,
      schema,
      captured_at,
    }
  }

  pub fn records(&self) -> &[Record] {
    &self.records
  }

  /// Headers shown to operators: every column except the record id column.
  pub fn display_headers(&self) -> Vec<&str> {
    self
      .headers
      .iter()
      .filter(|h| Some(h.as_str()) != self.id_header.as_deref())
      .map(String::as_str)
      .collect()
  }

  pub fn schema(&self) -> &ResolvedSchema {
    &self.schema
  }

  pub fn captured_at(&self) -> DateTime<Utc> {
    self.captured_at
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn record(&self, id: &str) -> Option<&Record> {
    self.records.iter().find(|r| r.id == id)
  }

  /// First record carrying `plate`. Plates are not unique in the store.
  pub fn find_by_plate(&self, plate: &str) -> Result<&Record> {
    let wanted = normalize_plate(plate);
    if wanted.is_empty() {
      return Err(InventoryError::RecordNotFound("an empty plate".to_string()));
    }
    self
      .records
      .iter()
      .find(|r| r.plate == wanted)
      .ok_or_else(|| InventoryError::RecordNotFound(format!("plate {}", wanted)))
  }

  /// Distinct non-empty locations, sorted, for the location picker.
  pub fn location_options(&self) -> Vec<String> {
    self
      .records
      .iter()
      .filter_map(|r| r.location())
      .map(String::from)
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect()
  }
}
