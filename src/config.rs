use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_TTL_SECS;
use crate::error::{InventoryError, Result};
use crate::update::{DEFAULT_MODIFIED_AT_FIELD, DEFAULT_MODIFIED_BY_FIELD};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Operators allowed to log in, by display name
  pub authorized_users: Vec<String>,
  pub backend: BackendConfig,
  /// Custom title for header (defaults to "yardloc")
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub audit: AuditConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
  /// Live Airtable table; the token comes from the environment
  Airtable {
    base_id: String,
    table_name: String,
    #[serde(default = "default_view")]
    view: Option<String>,
  },
  /// Published CSV export (URL or local path), read-only upstream
  Csv {
    source: String,
    id_column: Option<String>,
  },
}

fn default_view() -> Option<String> {
  Some("API_View".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds a loaded snapshot stays fresh
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
  DEFAULT_TTL_SECS as u64
}

/// One day; longer TTLs are clamped
const MAX_TTL_SECS: u64 = 86_400;

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::seconds(self.ttl_secs.min(MAX_TTL_SECS) as i64)
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
  /// Column stamped with the operator's name on every update
  #[serde(default = "default_modified_by")]
  pub modified_by_field: String,
  /// Column stamped with the update time
  #[serde(default = "default_modified_at")]
  pub modified_at_field: String,
}

fn default_modified_by() -> String {
  DEFAULT_MODIFIED_BY_FIELD.to_string()
}

fn default_modified_at() -> String {
  DEFAULT_MODIFIED_AT_FIELD.to_string()
}

impl Default for AuditConfig {
  fn default() -> Self {
    Self {
      modified_by_field: default_modified_by(),
      modified_at_field: default_modified_at(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./yardloc.yaml (current directory)
  /// 3. ./config.yaml (current directory)
  /// 4. $XDG_CONFIG_HOME/yardloc/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(InventoryError::ConfigLoad(format!(
          "Config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(InventoryError::ConfigLoad(
        "No configuration file found. Create one at ~/.config/yardloc/config.yaml\n\
         See config.example.yaml for the format."
          .to_string(),
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    for name in ["yardloc.yaml", "config.yaml"] {
      let local = PathBuf::from(name);
      if local.exists() {
        return Some(local);
      }
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("yardloc").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      InventoryError::ConfigLoad(format!(
        "Failed to read config file {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::parse(&contents).map_err(|e| match e {
      InventoryError::ConfigLoad(msg) => {
        InventoryError::ConfigLoad(format!("{}: {}", path.display(), msg))
      }
      other => other,
    })
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)
      .map_err(|e| InventoryError::ConfigLoad(format!("Failed to parse config: {}", e)))?;

    if config
      .authorized_users
      .iter()
      .all(|name| name.trim().is_empty())
    {
      return Err(InventoryError::ConfigLoad(
        "authorized_users must list at least one operator".to_string(),
      ));
    }

    Ok(config)
  }

  /// Get the Airtable token from environment variables.
  ///
  /// Checks YARDLOC_AIRTABLE_TOKEN first, then AIRTABLE_TOKEN as fallback.
  pub fn get_airtable_token() -> Result<String> {
    std::env::var("YARDLOC_AIRTABLE_TOKEN")
      .or_else(|_| std::env::var("AIRTABLE_TOKEN"))
      .map_err(|_| {
        InventoryError::Connection(
          "Airtable token not found. Set YARDLOC_AIRTABLE_TOKEN or AIRTABLE_TOKEN environment variable."
            .to_string(),
        )
      })
  }
}
