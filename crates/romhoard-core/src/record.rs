//! The aggregated per-file view — never stored, always derived.
//!
//! A [`GameRecord`] is rebuilt on demand by resolving the current fact set
//! for one identity down to a single winning value per kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fact::ResourceKind;

// ─── Attributed value ────────────────────────────────────────────────────────

/// A resolved value together with the source that won resolution for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributed {
  pub value:  String,
  pub source: String,
}

// ─── GameRecord ──────────────────────────────────────────────────────────────

/// The computed read model for one file: one winning value per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
  pub identity:     String,
  /// The originating file path, when known (cache-only lookups may lack it).
  pub file_path:    Option<String>,
  /// Match Engine score for the run that produced this record, 0-100.
  /// 100 for records synthesised purely from cache.
  pub search_match: u8,
  pub values:       BTreeMap<ResourceKind, Attributed>,
}

impl GameRecord {
  pub fn new(identity: impl Into<String>) -> Self {
    Self {
      identity:     identity.into(),
      file_path:    None,
      search_match: 0,
      values:       BTreeMap::new(),
    }
  }

  /// A convenience accessor for the resolved value of one kind.
  pub fn value(&self, kind: ResourceKind) -> Option<&str> {
    self.values.get(&kind).map(|a| a.value.as_str())
  }

  pub fn title(&self) -> Option<&str> { self.value(ResourceKind::Title) }

  /// Percentage of wanted kinds that resolved to a value, 0-100.
  ///
  /// The denominator is every textual kind plus the four artwork kinds a
  /// front-end list normally displays; video is only counted when the run
  /// asked for it.
  pub fn completeness(&self, include_video: bool) -> u8 {
    let mut wanted = vec![
      ResourceKind::Title,
      ResourceKind::Platform,
      ResourceKind::Description,
      ResourceKind::Developer,
      ResourceKind::Publisher,
      ResourceKind::Players,
      ResourceKind::Ages,
      ResourceKind::Tags,
      ResourceKind::Rating,
      ResourceKind::ReleaseDate,
      ResourceKind::Cover,
      ResourceKind::Screenshot,
      ResourceKind::Wheel,
      ResourceKind::Marquee,
    ];
    if include_video {
      wanted.push(ResourceKind::Video);
    }
    let have = wanted
      .iter()
      .filter(|kind| self.values.contains_key(kind))
      .count();
    ((have * 100) / wanted.len()) as u8
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record_with(kinds: &[ResourceKind]) -> GameRecord {
    let mut record = GameRecord::new("id-1");
    for &kind in kinds {
      record.values.insert(kind, Attributed {
        value:  "x".to_string(),
        source: "test".to_string(),
      });
    }
    record
  }

  #[test]
  fn completeness_of_empty_record_is_zero() {
    assert_eq!(record_with(&[]).completeness(false), 0);
  }

  #[test]
  fn completeness_counts_only_wanted_kinds() {
    let record = record_with(&[
      ResourceKind::Title,
      ResourceKind::Platform,
      ResourceKind::Texture, // not in the wanted set
    ]);
    // 2 of 14 wanted kinds present.
    assert_eq!(record.completeness(false), 14);
  }

  #[test]
  fn video_widens_the_denominator_when_requested() {
    let record = record_with(&[ResourceKind::Video]);
    assert_eq!(record.completeness(false), 0);
    assert_eq!(record.completeness(true), 6); // 1 of 15
  }

  #[test]
  fn full_record_scores_one_hundred() {
    let record = record_with(&[
      ResourceKind::Title,
      ResourceKind::Platform,
      ResourceKind::Description,
      ResourceKind::Developer,
      ResourceKind::Publisher,
      ResourceKind::Players,
      ResourceKind::Ages,
      ResourceKind::Tags,
      ResourceKind::Rating,
      ResourceKind::ReleaseDate,
      ResourceKind::Cover,
      ResourceKind::Screenshot,
      ResourceKind::Wheel,
      ResourceKind::Marquee,
    ]);
    assert_eq!(record.completeness(false), 100);
  }
}
