use std::collections::BTreeMap;

use tracing::debug;
use url::Url;

use super::api_types::{ApiErrorResponse, ApiListResponse};
use super::{RemoteDataset, RemoteRecord, RemoteTable};
use crate::error::{InventoryError, RemoteError};

const API_BASE: &str = "https://api.airtable.com/v0/";

/// Live read/write Airtable table.
#[derive(Clone)]
pub struct AirtableTable {
  http: reqwest::Client,
  table_url: Url,
  view: Option<String>,
  token: String,
  label: String,
}

impl AirtableTable {
  pub fn new(
    base_id: &str,
    table_name: &str,
    view: Option<String>,
    token: String,
  ) -> Result<Self, InventoryError> {
    if base_id.trim().is_empty() || table_name.trim().is_empty() {
      return Err(InventoryError::Connection(
        "Airtable base_id and table_name must be set".to_string(),
      ));
    }

    let mut table_url = Url::parse(API_BASE)
      .map_err(|e| InventoryError::Connection(format!("Invalid API url: {}", e)))?;
    table_url
      .path_segments_mut()
      .map_err(|_| InventoryError::Connection("Invalid API url".to_string()))?
      .pop_if_empty()
      .push(base_id.trim())
      .push(table_name.trim());

    let http = reqwest::Client::builder()
      .user_agent(concat!("yardloc/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| InventoryError::Connection(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      table_url,
      view,
      token,
      label: format!("airtable:{}/{}", base_id.trim(), table_name.trim()),
    })
  }

  /// URL of one page of the record listing.
  fn page_url(&self, offset: Option<&str>) -> Url {
    let mut url = self.table_url.clone();
    if self.view.is_some() || offset.is_some() {
      let mut query = url.query_pairs_mut();
      if let Some(view) = &self.view {
        query.append_pair("view", view);
      }
      if let Some(offset) = offset {
        query.append_pair("offset", offset);
      }
    }
    url
  }

  fn record_url(&self, id: &str) -> Url {
    let mut url = self.table_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.push(id);
    }
    url
  }

  /// Turn a non-success response into a rejection carrying Airtable's message.
  async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
      Ok(parsed) => parsed.error.message(),
      Err(_) if body.is_empty() => status.to_string(),
      Err(_) => body,
    };

    Err(RemoteError::Rejected {
      status: status.as_u16(),
      message,
    })
  }
}

impl RemoteTable for AirtableTable {
  async fn fetch_all(&self) -> Result<RemoteDataset, RemoteError> {
    let mut records = Vec::new();
    let mut offset: Option<String> = None;

    loop {
      let response = self
        .http
        .get(self.page_url(offset.as_deref()))
        .bearer_auth(&self.token)
        .send()
        .await?;

      let page: ApiListResponse = Self::check(response)
        .await?
        .json()
        .await
        .map_err(|e| RemoteError::Parse(e.to_string()))?;

      debug!(count = page.records.len(), "fetched airtable page");
      records.extend(page.records.into_iter().map(RemoteRecord::from));

      match page.offset {
        Some(next) => offset = Some(next),
        None => break,
      }
    }

    Ok(RemoteDataset::from_records(records))
  }

  async fn update(&self, id: &str, fields: &BTreeMap<String, String>) -> Result<(), RemoteError> {
    let body = serde_json::json!({ "fields": fields });

    let response = self
      .http
      .patch(self.record_url(id))
      .bearer_auth(&self.token)
      .json(&body)
      .send()
      .await?;

    Self::check(response).await?;
    Ok(())
  }

  fn is_live(&self) -> bool {
    true
  }

  fn describe(&self) -> String {
    self.label.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table(view: Option<&str>) -> AirtableTable {
    AirtableTable::new(
      "appBase",
      "Inventario Vehiculos",
      view.map(String::from),
      "tok".into(),
    )
    .unwrap()
  }

  #[test]
  fn test_urls_escape_table_name() {
    let table = table(None);
    assert_eq!(
      table.page_url(None).as_str(),
      "https://api.airtable.com/v0/appBase/Inventario%20Vehiculos"
    );
    assert_eq!(
      table.record_url("rec123").as_str(),
      "https://api.airtable.com/v0/appBase/Inventario%20Vehiculos/rec123"
    );
  }

  #[test]
  fn test_page_url_carries_view_and_offset() {
    let table = table(Some("API_View"));
    let url = table.page_url(Some("itr1/rec9"));
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
      pairs,
      vec![
        ("view".to_string(), "API_View".to_string()),
        ("offset".to_string(), "itr1/rec9".to_string()),
      ]
    );
  }

  #[test]
  fn test_missing_identifiers_are_connection_errors() {
    let err = AirtableTable::new("", "Inventario", None, "tok".into())
      .err()
      .unwrap();
    assert!(err.is_fatal());
  }

  #[test]
  fn test_airtable_is_live() {
    let table = table(None);
    assert!(table.is_live());
    assert_eq!(table.describe(), "airtable:appBase/Inventario Vehiculos");
  }
}
