//! Human-override seam for below-threshold matches.
//!
//! The worker consults a picker only after the automated verdict came back
//! "not found"; everything above threshold commits without ceremony. The
//! default strategy never overrides, which keeps the core algorithm free of
//! interactivity in tests and unattended runs.

use std::future::Future;

use romhoard_core::source::Candidate;

/// One candidate as presented to an operator, with its automated score.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
  pub candidate: Candidate,
  pub score:     u8,
}

pub trait CandidatePicker: Send + Sync {
  /// Choose a candidate for a file the automation rejected. `ranked` is
  /// sorted best-first and never empty. `None` keeps the automated verdict
  /// (not found); `Some(i)` accepts `ranked[i]` as a manual match.
  fn pick(
    &self,
    compare_title: &str,
    ranked: &[RankedCandidate],
  ) -> impl Future<Output = Option<usize>> + Send;
}

/// The default strategy: always keep the automated verdict.
pub struct AutoPicker;

impl CandidatePicker for AutoPicker {
  fn pick(
    &self,
    _compare_title: &str,
    _ranked: &[RankedCandidate],
  ) -> impl Future<Output = Option<usize>> + Send {
    std::future::ready(None)
  }
}
