//! Per-run configuration structs.
//!
//! Everything the store, worker pool, and match engine consult mid-algorithm
//! is passed in explicitly at construction time; nothing reads ambient
//! global state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fact::{ResourceKind, USER_SOURCE};

// ─── Priority ────────────────────────────────────────────────────────────────

/// Per-kind ordered source lists consulted during resolution. The first
/// listed source that has a fact for a kind wins; [`USER_SOURCE`] is always
/// implicitly first regardless of what the lists say.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityConfig {
  pub orderings: BTreeMap<ResourceKind, Vec<String>>,
}

impl PriorityConfig {
  /// The effective ordering for one kind: `"user"` prepended to the
  /// configured list (with any explicit `"user"` entry deduplicated), or
  /// `None` when no ordering is configured and resolution should fall back
  /// to newest-fact-wins.
  pub fn effective(&self, kind: ResourceKind) -> Option<Vec<&str>> {
    let configured = self.orderings.get(&kind)?;
    let mut ordering = vec![USER_SOURCE];
    ordering.extend(
      configured
        .iter()
        .map(String::as_str)
        .filter(|s| *s != USER_SOURCE),
    );
    Some(ordering)
  }
}

// ─── Matching ────────────────────────────────────────────────────────────────

/// Thresholds and exception data for the match engine.
///
/// The length thresholds are load-bearing for existing cached results and
/// are configuration, not constants to re-derive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
  /// Scores below this are "not found", 0-100.
  pub minimum_match:          u8,
  /// Words longer than this count as significant for the word-subset rule.
  pub significant_word_len:   usize,
  /// Title-length gap beyond which subtitle stripping kicks in.
  pub subtitle_length_gap:    usize,
  /// Minimum longer-title length before subtitle stripping is considered.
  pub subtitle_min_title_len: usize,
  /// Lower-cased titles exempt from the numeral equivalence filter. These
  /// carry a trailing numeral that is part of the name, not a sequel index.
  pub numeral_exceptions:     Vec<String>,
}

impl Default for MatchConfig {
  fn default() -> Self {
    Self {
      minimum_match:          65,
      significant_word_len:   3,
      subtitle_length_gap:    4,
      subtitle_min_title_len: 10,
      numeral_exceptions:     vec![
        "mega man x".to_string(),
        "final fantasy x".to_string(),
        "final fantasy x-2".to_string(),
        "gradius v".to_string(),
      ],
    }
  }
}

impl MatchConfig {
  pub fn is_numeral_exception(&self, lowered_title: &str) -> bool {
    self
      .numeral_exceptions
      .iter()
      .any(|e| lowered_title.starts_with(e.as_str()))
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Policy for the identity function: when to hash file content and when to
/// fall back to hashing the filename instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPolicy {
  /// Files larger than this hash by filename only.
  pub max_content_bytes:  u64,
  /// Extensions (lower-case, no dot) that always hash by filename. Archives
  /// and multi-file formats re-hash unstably or too slowly.
  pub filename_only_exts: Vec<String>,
}

impl Default for IdentityPolicy {
  fn default() -> Self {
    Self {
      max_content_bytes:  50 * 1024 * 1024,
      filename_only_exts: vec![
        "zip".to_string(),
        "7z".to_string(),
        "cue".to_string(),
        "m3u".to_string(),
      ],
    }
  }
}

impl IdentityPolicy {
  pub fn hashes_by_filename(&self, extension: &str, size: u64) -> bool {
    size == 0
      || size > self.max_content_bytes
      || self
        .filename_only_exts
        .iter()
        .any(|e| e.eq_ignore_ascii_case(extension))
  }
}

// ─── Run policy ──────────────────────────────────────────────────────────────

/// Failure and backpressure policy for one scraping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPolicy {
  /// Worker count for the pool; forced to 1 for rate-limited backends.
  pub workers:              usize,
  /// Re-scrape files that already have cached facts for the active backend.
  pub refresh:              bool,
  /// Fetch (and count toward completeness) video media.
  pub include_video:        bool,
  /// Consecutive not-found results across the whole run that abort it.
  pub max_consecutive_miss: usize,
  /// Transient-failure retries per backend call before the file is treated
  /// as not found.
  pub max_retries:          usize,
}

impl Default for RunPolicy {
  fn default() -> Self {
    Self {
      workers:              4,
      refresh:              false,
      include_video:        false,
      max_consecutive_miss: 30,
      max_retries:          3,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_is_prepended_to_configured_orderings() {
    let mut priority = PriorityConfig::default();
    priority.orderings.insert(ResourceKind::Title, vec![
      "openretro".to_string(),
      "mobygames".to_string(),
    ]);

    let effective = priority.effective(ResourceKind::Title).unwrap();
    assert_eq!(effective, vec!["user", "openretro", "mobygames"]);
  }

  #[test]
  fn explicit_user_entry_is_not_duplicated() {
    let mut priority = PriorityConfig::default();
    priority.orderings.insert(ResourceKind::Cover, vec![
      "mobygames".to_string(),
      "user".to_string(),
    ]);

    let effective = priority.effective(ResourceKind::Cover).unwrap();
    assert_eq!(effective, vec!["user", "mobygames"]);
  }

  #[test]
  fn unconfigured_kind_has_no_ordering() {
    assert!(PriorityConfig::default().effective(ResourceKind::Title).is_none());
  }

  #[test]
  fn identity_policy_fallback_triggers() {
    let policy = IdentityPolicy::default();
    assert!(policy.hashes_by_filename("zip", 1024));
    assert!(policy.hashes_by_filename("ZIP", 1024));
    assert!(policy.hashes_by_filename("sfc", 0));
    assert!(policy.hashes_by_filename("iso", 51 * 1024 * 1024));
    assert!(!policy.hashes_by_filename("sfc", 1024));
  }

  #[test]
  fn numeral_exceptions_match_by_prefix() {
    let config = MatchConfig::default();
    assert!(config.is_numeral_exception("mega man x"));
    assert!(config.is_numeral_exception("final fantasy x-2"));
    assert!(!config.is_numeral_exception("mega man 3"));
  }
}
