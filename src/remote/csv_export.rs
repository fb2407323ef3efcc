use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};
use url::Url;

use super::{RemoteDataset, RemoteRecord, RemoteTable};
use crate::error::{InventoryError, RemoteError};
use crate::schema::{CanonicalField, ResolvedSchema};
use crate::snapshot::normalize_plate;

/// Where the published export is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CsvSource {
  Url(Url),
  Path(PathBuf),
}

/// Local edit of one row, pinned to the plate the row had when it was edited.
#[derive(Debug, Clone)]
struct OverlayEdit {
  plate: String,
  fields: BTreeMap<String, String>,
}

#[derive(Default)]
struct OverlayState {
  /// Local edits per record id, re-applied on every fetch
  edits: BTreeMap<String, OverlayEdit>,
  /// Last merged dataset, used to validate ids and to publish
  last: Option<RemoteDataset>,
}

/// Read-only published CSV export with a local write overlay.
///
/// Nothing is ever pushed back to the source. The operator writes the merged
/// table out with [`CsvExport::publish`] and re-publishes it by hand.
pub struct CsvExport {
  source: CsvSource,
  id_column: Option<String>,
  http: reqwest::Client,
  state: Mutex<OverlayState>,
}

impl CsvExport {
  /// `source` is an `http(s)` URL or a local file path.
  pub fn new(source: &str, id_column: Option<String>) -> Result<Self, InventoryError> {
    let source = source.trim();
    if source.is_empty() {
      return Err(InventoryError::Connection(
        "CSV source must be set".to_string(),
      ));
    }

    let source = match Url::parse(source) {
      Ok(url) if url.scheme() == "http" || url.scheme() == "https" => CsvSource::Url(url),
      _ => CsvSource::Path(PathBuf::from(source)),
    };

    Ok(Self {
      source,
      id_column,
      http: reqwest::Client::new(),
      state: Mutex::new(OverlayState::default()),
    })
  }

  async fn read_source(&self) -> Result<String, RemoteError> {
    match &self.source {
      CsvSource::Url(url) => {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
          return Err(RemoteError::Rejected {
            status: status.as_u16(),
            message: format!("failed to download {}", url),
          });
        }
        Ok(response.text().await?)
      }
      CsvSource::Path(path) => tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RemoteError::Transport(format!("{}: {}", path.display(), e))),
    }
  }

  /// Write the merged table (source plus local edits) to `path`.
  ///
  /// Returns the number of rows written.
  pub fn publish(&self, path: &Path) -> Result<usize, InventoryError> {
    let state = self
      .state
      .lock()
      .map_err(|e| InventoryError::Export(format!("Lock poisoned: {}", e)))?;
    let dataset = state
      .last
      .as_ref()
      .ok_or_else(|| InventoryError::Export("nothing has been loaded yet".to_string()))?;

    let mut writer = csv::Writer::from_path(path)
      .map_err(|e| InventoryError::Export(format!("{}: {}", path.display(), e)))?;
    write_dataset(&mut writer, dataset).map_err(|e| InventoryError::Export(e.to_string()))?;
    writer
      .flush()
      .map_err(|e| InventoryError::Export(e.to_string()))?;

    info!(path = %path.display(), rows = dataset.records.len(), "published local inventory copy");
    Ok(dataset.records.len())
  }

  /// Number of records with unpublished local edits.
  pub fn pending_edits(&self) -> usize {
    self.state.lock().map(|s| s.edits.len()).unwrap_or(0)
  }
}

impl RemoteTable for CsvExport {
  async fn fetch_all(&self) -> Result<RemoteDataset, RemoteError> {
    let text = self.read_source().await?;
    let mut dataset = parse_csv(&text, self.id_column.as_deref())?;

    let mut state = self
      .state
      .lock()
      .map_err(|e| RemoteError::Transport(format!("Lock poisoned: {}", e)))?;

    apply_overlay(&mut dataset, &state.edits);
    debug!(
      rows = dataset.records.len(),
      edits = state.edits.len(),
      "loaded csv export"
    );
    state.last = Some(dataset.clone());

    Ok(dataset)
  }

  async fn update(&self, id: &str, fields: &BTreeMap<String, String>) -> Result<(), RemoteError> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| RemoteError::Transport(format!("Lock poisoned: {}", e)))?;

    let plate = state
      .last
      .as_ref()
      .and_then(|d| {
        let column = plate_column(&d.headers);
        d.records
          .iter()
          .find(|r| r.id == id)
          .map(|r| plate_of(r, column.as_deref()))
      })
      .ok_or_else(|| RemoteError::UnknownRecord(id.to_string()))?;

    let edit = state
      .edits
      .entry(id.to_string())
      .or_insert_with(|| OverlayEdit {
        plate: plate.clone(),
        fields: BTreeMap::new(),
      });
    if edit.plate != plate {
      // The row holds another vehicle now; the old edit no longer applies.
      *edit = OverlayEdit {
        plate,
        fields: BTreeMap::new(),
      };
    }
    edit
      .fields
      .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

    // Keep the published copy in step with what the next fetch will return.
    let edits = state.edits.clone();
    if let Some(last) = state.last.as_mut() {
      apply_overlay(last, &edits);
    }

    Ok(())
  }

  fn is_live(&self) -> bool {
    false
  }

  fn describe(&self) -> String {
    match &self.source {
      CsvSource::Url(url) => format!("csv:{}", url.host_str().unwrap_or("export")),
      CsvSource::Path(path) => format!("csv:{}", path.display()),
    }
  }
}

/// Parse an exported table. Ids come from `id_column` when given, otherwise
/// from the 1-based data row number.
fn parse_csv(text: &str, id_column: Option<&str>) -> Result<RemoteDataset, RemoteError> {
  let text = text.trim_start_matches('\u{feff}');
  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .from_reader(text.as_bytes());

  let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

  let id_index = match id_column {
    Some(column) => Some(
      headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(column.trim()))
        .ok_or_else(|| RemoteError::Parse(format!("id column '{}' not found", column)))?,
    ),
    None => None,
  };

  let mut records = Vec::new();
  for (row, result) in reader.records().enumerate() {
    let row_values = result?;
    let fields: BTreeMap<String, String> = headers
      .iter()
      .zip(row_values.iter())
      .map(|(h, v)| (h.clone(), v.to_string()))
      .collect();

    let id = id_index
      .and_then(|i| row_values.get(i))
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(String::from)
      .unwrap_or_else(|| format!("row-{}", row + 1));

    records.push(RemoteRecord { id, fields });
  }

  Ok(RemoteDataset {
    id_header: id_index.map(|i| headers[i].clone()),
    headers,
    records,
  })
}

/// Raw header of the plate column, if the table has one.
fn plate_column(headers: &[String]) -> Option<String> {
  ResolvedSchema::resolve(headers)
    .raw_header(CanonicalField::Plate)
    .map(String::from)
}

fn plate_of(record: &RemoteRecord, column: Option<&str>) -> String {
  column
    .and_then(|c| record.fields.get(c))
    .map(|p| normalize_plate(p))
    .unwrap_or_default()
}

/// Re-apply local edits by id. An edit whose row now carries a different
/// plate is skipped: the export was re-sorted or rows were added upstream.
fn apply_overlay(dataset: &mut RemoteDataset, edits: &BTreeMap<String, OverlayEdit>) {
  let column = plate_column(&dataset.headers);
  for record in &mut dataset.records {
    let Some(edit) = edits.get(&record.id) else {
      continue;
    };
    let plate = plate_of(record, column.as_deref());
    if plate != edit.plate {
      warn!(
        record = %record.id,
        edited = %edit.plate,
        found = %plate,
        "row changed upstream, local edit not applied"
      );
      continue;
    }
    for (name, value) in &edit.fields {
      record.fields.insert(name.clone(), value.clone());
      if !dataset.headers.contains(name) {
        dataset.headers.push(name.clone());
      }
    }
  }
}

fn write_dataset<W: std::io::Write>(
  writer: &mut csv::Writer<W>,
  dataset: &RemoteDataset,
) -> csv::Result<()> {
  writer.write_record(&dataset.headers)?;
  for record in &dataset.records {
    writer.write_record(
      dataset
        .headers
        .iter()
        .map(|h| record.fields.get(h).map(String::as_str).unwrap_or("")),
    )?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const EXPORT: &str = "\u{feff}PLACA,UBICACION FISICA,MARCA\nABC123,Patio 1,Mazda\nDEF456,,Renault\n";

  fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("yardloc-{}-{}", std::process::id(), name))
  }

  fn export_file(name: &str) -> PathBuf {
    let path = temp_path(name);
    std::fs::write(&path, EXPORT).unwrap();
    path
  }

  #[test]
  fn test_parse_uses_row_numbers_without_id_column() {
    let dataset = parse_csv(EXPORT, None).unwrap();
    assert_eq!(dataset.headers, vec!["PLACA", "UBICACION FISICA", "MARCA"]);
    assert_eq!(dataset.records[0].id, "row-1");
    assert_eq!(dataset.records[1].id, "row-2");
    assert_eq!(
      dataset.records[1].fields.get("UBICACION FISICA").map(String::as_str),
      Some("")
    );
  }

  #[test]
  fn test_parse_with_id_column() {
    let dataset = parse_csv("ID,Placa\nrecA,ABC123\n,DEF456\n", Some("id")).unwrap();
    assert_eq!(dataset.id_header.as_deref(), Some("ID"));
    assert_eq!(dataset.records[0].id, "recA");
    assert_eq!(dataset.records[1].id, "row-2");

    let err = parse_csv("Placa\nABC123\n", Some("ID")).unwrap_err();
    assert!(matches!(err, RemoteError::Parse(_)));
  }

  #[tokio::test]
  async fn test_updates_survive_refetch_and_add_columns() {
    let path = export_file("overlay.csv");
    let export = CsvExport::new(path.to_str().unwrap(), None).unwrap();
    assert!(!export.is_live());

    export.fetch_all().await.unwrap();

    let mut fields = BTreeMap::new();
    fields.insert("UBICACION FISICA".to_string(), "Yard 3".to_string());
    fields.insert("Modificado Por".to_string(), "Alice".to_string());
    export.update("row-1", &fields).await.unwrap();
    assert_eq!(export.pending_edits(), 1);

    let dataset = export.fetch_all().await.unwrap();
    assert_eq!(
      dataset.records[0].fields.get("UBICACION FISICA").map(String::as_str),
      Some("Yard 3")
    );
    assert_eq!(dataset.headers.last().map(String::as_str), Some("Modificado Por"));

    std::fs::remove_file(&path).ok();
  }

  #[tokio::test]
  async fn test_update_unknown_record_is_rejected() {
    let path = export_file("unknown.csv");
    let export = CsvExport::new(path.to_str().unwrap(), None).unwrap();
    export.fetch_all().await.unwrap();

    let err = export.update("row-99", &BTreeMap::new()).await.unwrap_err();
    assert!(matches!(err, RemoteError::UnknownRecord(_)));
    assert_eq!(export.pending_edits(), 0);

    std::fs::remove_file(&path).ok();
  }

  #[tokio::test]
  async fn test_publish_writes_merged_table() {
    let path = export_file("publish-src.csv");
    let out = temp_path("publish-out.csv");
    let export = CsvExport::new(path.to_str().unwrap(), None).unwrap();

    assert!(export.publish(&out).is_err());

    export.fetch_all().await.unwrap();
    let mut fields = BTreeMap::new();
    fields.insert("UBICACION FISICA".to_string(), "Bodega 2".to_string());
    export.update("row-2", &fields).await.unwrap();

    assert_eq!(export.publish(&out).unwrap(), 2);
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
      written,
      "PLACA,UBICACION FISICA,MARCA\nABC123,Patio 1,Mazda\nDEF456,Bodega 2,Renault\n"
    );

    std::fs::remove_file(&path).ok();
    std::fs::remove_file(&out).ok();
  }

  #[tokio::test]
  async fn test_edit_does_not_follow_row_number_to_another_vehicle() {
    let path = export_file("shifted.csv");
    let export = CsvExport::new(path.to_str().unwrap(), None).unwrap();
    export.fetch_all().await.unwrap();

    let mut fields = BTreeMap::new();
    fields.insert("UBICACION FISICA".to_string(), "Yard 3".to_string());
    export.update("row-1", &fields).await.unwrap();

    std::fs::write(
      &path,
      "PLACA,UBICACION FISICA,MARCA\nNEW001,Taller,Kia\nABC123,Patio 1,Mazda\nDEF456,,Renault\n",
    )
    .unwrap();
    let dataset = export.fetch_all().await.unwrap();

    let location = |i: usize| {
      dataset.records[i]
        .fields
        .get("UBICACION FISICA")
        .map(String::as_str)
    };
    assert_eq!(dataset.records[0].id, "row-1");
    assert_eq!(location(0), Some("Taller"));
    assert_eq!(location(1), Some("Patio 1"));

    // A fresh edit on the shifted row replaces the stale one.
    let mut fields = BTreeMap::new();
    fields.insert("UBICACION FISICA".to_string(), "Bodega 2".to_string());
    export.update("row-1", &fields).await.unwrap();
    let dataset = export.fetch_all().await.unwrap();
    assert_eq!(
      dataset.records[0].fields.get("UBICACION FISICA").map(String::as_str),
      Some("Bodega 2")
    );
    assert_eq!(export.pending_edits(), 1);

    std::fs::remove_file(&path).ok();
  }

  #[test]
  fn test_source_kinds() {
    let url = CsvExport::new("https://docs.example.com/pub?output=csv", None).unwrap();
    assert_eq!(url.describe(), "csv:docs.example.com");
    let path = CsvExport::new("/tmp/inventario.csv", None).unwrap();
    assert_eq!(path.describe(), "csv:/tmp/inventario.csv");
    assert!(CsvExport::new("  ", None).is_err());
  }
}
