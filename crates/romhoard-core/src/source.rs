//! The `ScrapeSource` trait and supporting query/result types.
//!
//! The trait is implemented by source backends (web APIs, screen-scraped
//! sites, local databases, the cache itself). The aggregation worker depends
//! on this abstraction, not on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::fact::ResourceKind;

// ─── Capability declaration ──────────────────────────────────────────────────

/// Whether a backend's search step returns at most one trustworthy result or
/// many candidates requiring ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
  /// Trust the first/only candidate directly (e.g. a checksum-keyed lookup).
  SingleResult,
  /// Candidates must be ranked by the match engine.
  MultiResult,
}

/// Static capabilities a backend declares up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceProfile {
  pub cardinality:         Cardinality,
  /// A precise multi-result backend returning exactly one candidate is
  /// trusted without ranking.
  pub precise:             bool,
  /// Minimum gap between requests, in milliseconds. Zero means unthrottled.
  pub request_interval_ms: u64,
}

impl SourceProfile {
  pub const fn multi() -> Self {
    Self {
      cardinality: Cardinality::MultiResult,
      precise: false,
      request_interval_ms: 0,
    }
  }

  pub const fn single() -> Self {
    Self {
      cardinality: Cardinality::SingleResult,
      precise: true,
      request_interval_ms: 0,
    }
  }

  pub const fn precise(mut self) -> Self {
    self.precise = true;
    self
  }

  pub const fn throttled(mut self, interval_ms: u64) -> Self {
    self.request_interval_ms = interval_ms;
    self
  }
}

// ─── Query and result types ──────────────────────────────────────────────────

/// One search attempt. The worker issues several variants per file (with and
/// without subtitle, numeral forms swapped) and stops at the first that
/// yields candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
  pub text:     String,
  /// Platform hint, e.g. "snes". Backends that key searches by platform use
  /// it to scope results; others ignore it.
  pub platform: String,
}

impl SearchQuery {
  pub fn new(text: impl Into<String>, platform: impl Into<String>) -> Self {
    Self { text: text.into(), platform: platform.into() }
  }
}

/// An ephemeral search result. Never persisted directly — only the match
/// engine's winner, after a full [`ScrapeSource::fetch`], becomes facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
  pub title:        String,
  pub platform:     String,
  /// Release year when the backend exposes one in search results; used for
  /// the year sanity check.
  pub release_year: Option<i32>,
  /// Opaque backend-specific handle (an API id, a URL, a row id) that
  /// `fetch` needs to retrieve full attributes.
  pub source_ref:   serde_json::Value,
}

impl Candidate {
  pub fn new(title: impl Into<String>, platform: impl Into<String>) -> Self {
    Self {
      title:        title.into(),
      platform:     platform.into(),
      release_year: None,
      source_ref:   serde_json::Value::Null,
    }
  }
}

/// One binary blob fetched for the winning candidate.
#[derive(Debug, Clone)]
pub struct MediaPayload {
  pub kind:      ResourceKind,
  pub data:      Bytes,
  /// Original file extension (without the dot), when known.
  pub extension: Option<String>,
}

/// The full attribute set fetched for the winning candidate. Empty text
/// values are not committed as facts.
#[derive(Debug, Clone, Default)]
pub struct SourceAttributes {
  pub texts: BTreeMap<ResourceKind, String>,
  pub media: Vec<MediaPayload>,
}

impl SourceAttributes {
  pub fn is_empty(&self) -> bool {
    self.texts.is_empty() && self.media.is_empty()
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Failure taxonomy for backend calls.
///
/// Transient failures are retried a bounded number of times by the worker and
/// then downgraded to "not found" for that file. Fatal failures abort the
/// whole run (already-committed facts are preserved).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
  #[error("transient source failure: {0}")]
  Transient(String),

  #[error("fatal source failure: {0}")]
  Fatal(String),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a metadata/artwork source backend.
///
/// All methods return `Send` futures so the trait can be driven from a
/// multi-threaded worker pool.
pub trait ScrapeSource: Send + Sync {
  /// Stable backend name; recorded as the `source` of every committed fact.
  fn name(&self) -> &str;

  /// Static capability declaration, read once at pool construction.
  fn profile(&self) -> SourceProfile;

  /// Remaining request budget, if the backend tracks one. `-1` means
  /// unbounded. The pool treats zero as a drain-and-stop signal.
  fn requests_remaining(&self) -> i64 { -1 }

  /// Return candidate records for one query variant. Any size, including
  /// empty, is a valid response.
  fn search(
    &self,
    query: &SearchQuery,
  ) -> impl Future<Output = Result<Vec<Candidate>, SourceError>> + Send;

  /// Fetch the full attribute set for the chosen winner. Only called once
  /// per file, and never for cache-synthesised candidates.
  fn fetch(
    &self,
    candidate: &Candidate,
  ) -> impl Future<Output = Result<SourceAttributes, SourceError>> + Send;
}
