//! Remote inventory table backends.
//!
//! Two shapes are supported: a live Airtable table that accepts writes, and a
//! published CSV export that is read-only upstream. Writes against the export
//! land in a local overlay that the operator publishes by hand.

mod airtable;
mod api_types;
mod csv_export;
#[cfg(test)]
pub mod memory;

use std::collections::BTreeMap;

use crate::config::BackendConfig;
use crate::error::{InventoryError, RemoteError};

pub use airtable::AirtableTable;
pub use csv_export::CsvExport;

/// One row as the remote store returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
  pub id: String,
  pub fields: BTreeMap<String, String>,
}

/// Result of a full fetch: raw headers in table order plus the rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteDataset {
  pub headers: Vec<String>,
  pub records: Vec<RemoteRecord>,
  /// Column the record ids were read from, if the ids live in the table
  pub id_header: Option<String>,
}

impl RemoteDataset {
  /// Build a dataset whose headers are the union of field names in first-seen order.
  pub fn from_records(records: Vec<RemoteRecord>) -> Self {
    let mut headers: Vec<String> = Vec::new();
    for record in &records {
      for name in record.fields.keys() {
        if !headers.contains(name) {
          headers.push(name.clone());
        }
      }
    }
    Self {
      headers,
      records,
      id_header: None,
    }
  }
}

/// Minimal table API the inventory core needs.
#[allow(async_fn_in_trait)]
pub trait RemoteTable {
  /// Fetch every record of the table.
  async fn fetch_all(&self) -> Result<RemoteDataset, RemoteError>;

  /// Set `fields` on one record in a single call.
  async fn update(&self, id: &str, fields: &BTreeMap<String, String>) -> Result<(), RemoteError>;

  /// Whether writes reach the shared store directly.
  fn is_live(&self) -> bool;

  /// Short label for the header bar and logs.
  fn describe(&self) -> String;
}

/// Backend selected by configuration.
pub enum Backend {
  Airtable(AirtableTable),
  Csv(CsvExport),
}

impl Backend {
  /// Build the configured backend. Missing credentials or malformed settings
  /// are connection errors.
  pub fn connect(config: &BackendConfig) -> Result<Self, InventoryError> {
    match config {
      BackendConfig::Airtable {
        base_id,
        table_name,
        view,
      } => {
        let token = crate::config::Config::get_airtable_token()?;
        let table = AirtableTable::new(base_id, table_name, view.clone(), token)?;
        Ok(Backend::Airtable(table))
      }
      BackendConfig::Csv { source, id_column } => {
        Ok(Backend::Csv(CsvExport::new(source, id_column.clone())?))
      }
    }
  }

  /// The local export backend, when writes need manual publishing.
  pub fn as_csv(&self) -> Option<&CsvExport> {
    match self {
      Backend::Csv(csv) => Some(csv),
      Backend::Airtable(_) => None,
    }
  }
}

impl RemoteTable for Backend {
  async fn fetch_all(&self) -> Result<RemoteDataset, RemoteError> {
    match self {
      Backend::Airtable(table) => table.fetch_all().await,
      Backend::Csv(csv) => csv.fetch_all().await,
    }
  }

  async fn update(&self, id: &str, fields: &BTreeMap<String, String>) -> Result<(), RemoteError> {
    match self {
      Backend::Airtable(table) => table.update(id, fields).await,
      Backend::Csv(csv) => csv.update(id, fields).await,
    }
  }

  fn is_live(&self) -> bool {
    match self {
      Backend::Airtable(table) => table.is_live(),
      Backend::Csv(csv) => csv.is_live(),
    }
  }

  fn describe(&self) -> String {
    match self {
      Backend::Airtable(table) => table.describe(),
      Backend::Csv(csv) => csv.describe(),
    }
  }
}
