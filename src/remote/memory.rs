//! In-memory table for tests. Counts calls and can be told to fail.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{RemoteDataset, RemoteRecord, RemoteTable};
use crate::error::RemoteError;

#[derive(Default)]
pub struct MemoryTable {
  headers: Vec<String>,
  records: Mutex<Vec<RemoteRecord>>,
  fetches: AtomicUsize,
  updates: AtomicUsize,
  fail_fetch: AtomicBool,
  fail_update: AtomicBool,
}

impl MemoryTable {
  pub fn new(headers: &[&str], rows: &[(&str, &[&str])]) -> Self {
    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let records = rows
      .iter()
      .map(|(id, values)| RemoteRecord {
        id: id.to_string(),
        fields: headers
          .iter()
          .cloned()
          .zip(values.iter().map(|v| v.to_string()))
          .collect(),
      })
      .collect();

    Self {
      headers,
      records: Mutex::new(records),
      ..Default::default()
    }
  }

  /// Plate / physical location / brand table used across the tests.
  pub fn inventory() -> Self {
    Self::new(
      &["Plate", "Physical Location", "Brand"],
      &[
        ("rec1", &["ABC123", "Patio 1", "Mazda"]),
        ("rec2", &["DEF456", "Bodega 2", "Renault"]),
        ("rec3", &["GHI789", "", "Chevrolet"]),
      ],
    )
  }

  pub fn fetches(&self) -> usize {
    self.fetches.load(Ordering::SeqCst)
  }

  pub fn updates(&self) -> usize {
    self.updates.load(Ordering::SeqCst)
  }

  pub fn set_fail_fetch(&self, fail: bool) {
    self.fail_fetch.store(fail, Ordering::SeqCst);
  }

  pub fn set_fail_update(&self, fail: bool) {
    self.fail_update.store(fail, Ordering::SeqCst);
  }

  pub fn field(&self, id: &str, name: &str) -> Option<String> {
    let records = self.records.lock().unwrap();
    records
      .iter()
      .find(|r| r.id == id)
      .and_then(|r| r.fields.get(name).cloned())
  }
}

impl RemoteTable for MemoryTable {
  async fn fetch_all(&self) -> Result<RemoteDataset, RemoteError> {
    self.fetches.fetch_add(1, Ordering::SeqCst);
    if self.fail_fetch.load(Ordering::SeqCst) {
      return Err(RemoteError::Transport("connection refused".into()));
    }
    let records = self.records.lock().unwrap().clone();
    Ok(RemoteDataset {
      headers: self.headers.clone(),
      records,
      id_header: None,
    })
  }

  async fn update(&self, id: &str, fields: &BTreeMap<String, String>) -> Result<(), RemoteError> {
    self.updates.fetch_add(1, Ordering::SeqCst);
    if self.fail_update.load(Ordering::SeqCst) {
      return Err(RemoteError::Rejected {
        status: 422,
        message: "INVALID_VALUE_FOR_COLUMN".into(),
      });
    }
    let mut records = self.records.lock().unwrap();
    let record = records
      .iter_mut()
      .find(|r| r.id == id)
      .ok_or_else(|| RemoteError::UnknownRecord(id.to_string()))?;
    record
      .fields
      .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(())
  }

  fn is_live(&self) -> bool {
    true
  }

  fn describe(&self) -> String {
    "memory".to_string()
  }
}
