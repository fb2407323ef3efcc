//! Resolution of remote column headers onto canonical fields.
//!
//! The inventory table is maintained by hand, so the same column shows up as
//! `Placa`, `PLACA ` or `Plate` depending on who created the base. Each
//! canonical field has a fixed, priority-ordered list of known spellings; the
//! first spelling present in the header set wins.

use std::collections::BTreeMap;
use std::fmt;

/// Stable internal name for a column of the inventory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CanonicalField {
  Plate,
  Location,
  Brand,
  Reference,
  Year,
  Color,
  Vin,
}

impl CanonicalField {
  pub const ALL: [CanonicalField; 7] = [
    CanonicalField::Plate,
    CanonicalField::Location,
    CanonicalField::Brand,
    CanonicalField::Reference,
    CanonicalField::Year,
    CanonicalField::Color,
    CanonicalField::Vin,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Plate => "plate",
      Self::Location => "location",
      Self::Brand => "brand",
      Self::Reference => "reference",
      Self::Year => "year",
      Self::Color => "color",
      Self::Vin => "vin",
    }
  }

  /// Known header spellings, normalized, highest priority first.
  pub fn candidates(&self) -> &'static [&'static str] {
    match self {
      Self::Plate => &["PLACA", "PLATE", "LICENSE PLATE", "MATRÍCULA", "MATRICULA"],
      Self::Location => LOCATION_CANDIDATES,
      Self::Brand => &["MARCA", "BRAND", "MAKE"],
      Self::Reference => &["REFERENCIA", "REFERENCE", "LÍNEA", "LINEA", "MODEL"],
      Self::Year => &["AÑO", "ANO", "YEAR", "MODEL YEAR"],
      Self::Color => &["COLOR", "COLOUR"],
      Self::Vin => &["VIN", "CHASIS", "CHASSIS"],
    }
  }
}

impl fmt::Display for CanonicalField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Location spellings: physical location, then current location, then bare location.
pub const LOCATION_CANDIDATES: &[&str] = &[
  "UBICACIÓN FÍSICA",
  "UBICACION FISICA",
  "PHYSICAL LOCATION",
  "UBICACIÓN ACTUAL",
  "UBICACION ACTUAL",
  "CURRENT LOCATION",
  "UBICACIÓN",
  "UBICACION",
  "LOCATION",
];

/// Normalize a raw header for comparison: trimmed and uppercased.
pub fn normalize_header(header: &str) -> String {
  header.trim().to_uppercase()
}

/// Canonical view of one header set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSchema {
  /// Normalized header -> canonical field, for every header matching a synonym
  by_header: BTreeMap<String, CanonicalField>,
  /// Canonical field -> raw header chosen for reads and writes
  raw_by_field: BTreeMap<CanonicalField, String>,
}

impl ResolvedSchema {
  /// Resolve a header set. Pure: the same headers always give the same schema,
  /// whatever order they arrive in.
  pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
    let normalized: Vec<(String, &str)> = headers
      .iter()
      .map(|h| (normalize_header(h.as_ref()), h.as_ref()))
      .collect();

    let mut by_header = BTreeMap::new();
    let mut raw_by_field = BTreeMap::new();

    for field in CanonicalField::ALL {
      let candidates = field.candidates();

      for (norm, _) in &normalized {
        if candidates.contains(&norm.as_str()) {
          by_header.insert(norm.clone(), field);
        }
      }

      let chosen = candidates.iter().find_map(|candidate| {
        normalized
          .iter()
          .filter(|(norm, _)| norm == candidate)
          .map(|(_, raw)| *raw)
          .min()
      });

      if let Some(raw) = chosen {
        raw_by_field.insert(field, raw.to_string());
      }
    }

    Self {
      by_header,
      raw_by_field,
    }
  }

  /// Canonical field a raw header maps to, if it is a known synonym.
  pub fn field_for_header(&self, header: &str) -> Option<CanonicalField> {
    self.by_header.get(&normalize_header(header)).copied()
  }

  /// Raw header backing a canonical field.
  pub fn raw_header(&self, field: CanonicalField) -> Option<&str> {
    self.raw_by_field.get(&field).map(String::as_str)
  }

  pub fn location_header(&self) -> Option<&str> {
    self.raw_header(CanonicalField::Location)
  }

  /// Whether location updates can be offered for this header set.
  pub fn has_location(&self) -> bool {
    self.raw_by_field.contains_key(&CanonicalField::Location)
  }
}
