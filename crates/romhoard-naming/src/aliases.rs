//! The alias table: filename stems mapped to canonical search titles.
//!
//! Consulted before all other name cleanup, so a stem like `smw` can be
//! taught to mean `Super Mario World`. Stored as a flat TOML table:
//!
//! ```toml
//! "smw" = "Super Mario World"
//! "Probotector (E)" = "Contra"
//! ```

use std::{collections::BTreeMap, path::Path};

use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
  map: BTreeMap<String, String>,
}

impl AliasTable {
  pub fn empty() -> Self { Self::default() }

  pub fn from_toml_str(input: &str) -> Result<Self> {
    let map: BTreeMap<String, String> = toml::from_str(input)?;
    Ok(Self { map })
  }

  /// Load from a TOML file. A missing file yields an empty table; a
  /// malformed one is an error.
  pub fn load(path: &Path) -> Result<Self> {
    match std::fs::read_to_string(path) {
      Ok(contents) => Self::from_toml_str(&contents),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        Ok(Self::empty())
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Exact-stem lookup.
  pub fn lookup(&self, stem: &str) -> Option<&str> {
    self.map.get(stem).map(String::as_str)
  }

  pub fn insert(&mut self, stem: impl Into<String>, title: impl Into<String>) {
    self.map.insert(stem.into(), title.into());
  }

  pub fn len(&self) -> usize { self.map.len() }

  pub fn is_empty(&self) -> bool { self.map.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toml_table_round_trips_lookups() {
    let table = AliasTable::from_toml_str(
      "\"smw\" = \"Super Mario World\"\n\"Probotector (E)\" = \"Contra\"\n",
    )
    .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.lookup("smw"), Some("Super Mario World"));
    assert_eq!(table.lookup("Probotector (E)"), Some("Contra"));
    assert_eq!(table.lookup("unknown"), None);
  }

  #[test]
  fn malformed_toml_is_an_error() {
    assert!(AliasTable::from_toml_str("not toml at all [").is_err());
  }
}
