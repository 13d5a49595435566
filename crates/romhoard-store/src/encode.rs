//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Resource kinds are stored
//! as their snake_case discriminants.

use chrono::{DateTime, Utc};
use romhoard_core::fact::{QuickIdEntry, ResourceFact, ResourceKind};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `facts` row.
pub struct RawFact {
  pub identity:    String,
  pub kind:        String,
  pub source:      String,
  pub value:       String,
  pub recorded_at: String,
}

impl RawFact {
  pub fn into_fact(self) -> Result<ResourceFact> {
    Ok(ResourceFact {
      identity:    self.identity,
      kind:        ResourceKind::parse(&self.kind)?,
      source:      self.source,
      value:       self.value,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from a `quick_ids` row.
pub struct RawQuickId {
  pub file_path:  String,
  pub checked_at: String,
  pub identity:   String,
}

impl RawQuickId {
  pub fn into_entry(self) -> Result<QuickIdEntry> {
    Ok(QuickIdEntry {
      file_path:  self.file_path,
      checked_at: decode_dt(&self.checked_at)?,
      identity:   self.identity,
    })
  }
}
