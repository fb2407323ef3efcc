//! Error taxonomy for inventory operations.
//!
//! Only [`InventoryError::ConfigLoad`] and [`InventoryError::Connection`] are
//! fatal; everything else is reported to the operator at the boundary of the
//! operation that produced it.

use thiserror::Error;

use crate::schema::CanonicalField;

#[derive(Debug, Error)]
pub enum InventoryError {
  #[error("Failed to load configuration: {0}")]
  ConfigLoad(String),

  #[error("Cannot connect to the inventory table: {0}")]
  Connection(String),

  #[error("Failed to refresh inventory data: {0}")]
  Fetch(String),

  #[error("No vehicle found for {0}")]
  RecordNotFound(String),

  #[error("No location column found; updating locations is disabled")]
  SchemaResolution,

  #[error("The inventory table has no column for {0}")]
  UnknownField(CanonicalField),

  #[error("Select or type a new value first")]
  EmptyValue,

  #[error("Could not update the record: {0}")]
  UpdateWrite(String),

  #[error("No operator is logged in")]
  NotAuthenticated,

  #[error("'{0}' is not an authorized operator")]
  UnauthorizedOperator(String),

  #[error("Failed to export: {0}")]
  Export(String),
}

impl InventoryError {
  /// Whether the session has to stop after this error.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::ConfigLoad(_) | Self::Connection(_))
  }
}

/// Failure reported by a remote table backend.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("rejected by the remote store ({status}): {message}")]
  Rejected { status: u16, message: String },

  #[error("unexpected response: {0}")]
  Parse(String),

  #[error("unknown record {0}")]
  UnknownRecord(String),
}

impl From<reqwest::Error> for RemoteError {
  fn from(e: reqwest::Error) -> Self {
    RemoteError::Transport(e.to_string())
  }
}

impl From<csv::Error> for RemoteError {
  fn from(e: csv::Error) -> Self {
    RemoteError::Parse(e.to_string())
  }
}

pub type Result<T, E = InventoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_only_config_and_connection_are_fatal() {
    assert!(InventoryError::ConfigLoad("x".into()).is_fatal());
    assert!(InventoryError::Connection("x".into()).is_fatal());
    assert!(!InventoryError::Fetch("x".into()).is_fatal());
    assert!(!InventoryError::RecordNotFound("ABC123".into()).is_fatal());
    assert!(!InventoryError::SchemaResolution.is_fatal());
    assert!(!InventoryError::UpdateWrite("x".into()).is_fatal());
  }

  #[test]
  fn test_messages_name_the_cause() {
    let err = InventoryError::UpdateWrite(
      RemoteError::Rejected {
        status: 422,
        message: "INVALID_VALUE".into(),
      }
      .to_string(),
    );
    assert_eq!(
      err.to_string(),
      "Could not update the record: rejected by the remote store (422): INVALID_VALUE"
    );
  }
}
