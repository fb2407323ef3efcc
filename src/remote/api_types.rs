//! Serde types matching Airtable REST responses.
//!
//! Kept apart from [`RemoteRecord`] so that cell values of any type can be
//! deserialized and then flattened to display text.

use serde::Deserialize;
use serde_json::Value;

use super::RemoteRecord;

// ============================================================================
// List records
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiRecord {
  pub id: String,
  #[serde(default)]
  pub fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub records: Vec<ApiRecord>,
  /// Present while more pages remain
  pub offset: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorDetail {
  Detailed {
    #[serde(rename = "type")]
    kind: String,
    message: Option<String>,
  },
  Code(String),
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
  pub error: ApiErrorDetail,
}

impl ApiErrorDetail {
  pub fn message(self) -> String {
    match self {
      ApiErrorDetail::Detailed {
        kind,
        message: Some(message),
      } => format!("{}: {}", kind, message),
      ApiErrorDetail::Detailed {
        kind,
        message: None,
      } => kind,
      ApiErrorDetail::Code(code) => code,
    }
  }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<ApiRecord> for RemoteRecord {
  fn from(record: ApiRecord) -> Self {
    RemoteRecord {
      id: record.id,
      fields: record
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), cell_text(value)))
        .collect(),
    }
  }
}

/// Render a cell value as text.
///
/// Cells can be:
/// - strings, numbers and checkboxes
/// - arrays (multiple select, linked records, lookups)
/// - objects such as collaborators or attachments, shown by name, email or url
fn cell_text(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Array(items) => items
      .iter()
      .map(cell_text)
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(", "),
    Value::Object(obj) => ["name", "email", "url"]
      .iter()
      .find_map(|key| obj.get(*key).and_then(|v| v.as_str()))
      .map(String::from)
      .unwrap_or_else(|| value.to_string()),
  }
}
