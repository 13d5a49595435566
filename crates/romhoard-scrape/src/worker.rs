//! The per-file aggregation algorithm.
//!
//! One call to [`process_file`] turns one pending file into a cache-hit
//! record, a freshly scraped and committed record, a miss, or a skip. All
//! failure handling happens here; the pool only tallies outcomes and
//! decides when the whole run should stop.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use romhoard_core::{
  config::{MatchConfig, RunPolicy},
  fact::{NewFact, ResourceKind},
  record::GameRecord,
  source::{
    Candidate, ScrapeSource, SearchQuery, SourceAttributes, SourceError,
  },
};
use romhoard_naming::{AliasTable, titles};
use romhoard_store::ResourceStore;

use crate::{
  match_engine,
  picker::{CandidatePicker, RankedCandidate},
  queue::WorkQueue,
  rate::RateGate,
};

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

// ─── Context ─────────────────────────────────────────────────────────────────

/// Everything one worker needs, shared across the pool.
pub struct WorkerContext<S, P> {
  pub store:        Arc<ResourceStore>,
  pub source:       Arc<S>,
  pub queue:        Arc<WorkQueue>,
  pub gate:         Arc<RateGate>,
  pub picker:       Arc<P>,
  pub aliases:      Arc<AliasTable>,
  /// Platform hint passed with every search, e.g. "snes".
  pub platform:     String,
  pub match_config: MatchConfig,
  pub run:          RunPolicy,
  /// Resolve purely from the cache, across all sources; the backend is
  /// never called.
  pub cache_only:   bool,
}

impl<S, P> Clone for WorkerContext<S, P> {
  fn clone(&self) -> Self {
    Self {
      store:        self.store.clone(),
      source:       self.source.clone(),
      queue:        self.queue.clone(),
      gate:         self.gate.clone(),
      picker:       self.picker.clone(),
      aliases:      self.aliases.clone(),
      platform:     self.platform.clone(),
      match_config: self.match_config.clone(),
      run:          self.run.clone(),
      cache_only:   self.cache_only,
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What happened to one file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
  /// Matched and committed, or synthesized from the cache.
  Found { record: GameRecord, from_cache: bool },
  /// No candidate survived, or the best score fell below threshold.
  NotFound { compare_title: String, best_score: u8 },
  /// The file could not be processed at all.
  Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct FileEvent {
  pub file_path: PathBuf,
  pub outcome:   FileOutcome,
}

pub(crate) struct FileReport {
  pub event: FileEvent,
  /// Fatal source failure; the pool drains the queue when set.
  pub fatal: Option<String>,
}

fn report(path: &Path, outcome: FileOutcome) -> FileReport {
  FileReport {
    event: FileEvent { file_path: path.to_path_buf(), outcome },
    fatal: None,
  }
}

fn fatal(path: &Path, reason: String) -> FileReport {
  FileReport {
    event: FileEvent {
      file_path: path.to_path_buf(),
      outcome:   FileOutcome::Skipped {
        reason: format!("source failure: {reason}"),
      },
    },
    fatal: Some(reason),
  }
}

enum SourceCall<T> {
  Ok(T),
  /// Transient retries exhausted; the file is treated as not found.
  Exhausted,
  Fatal(String),
}

// ─── Per-file algorithm ──────────────────────────────────────────────────────

pub(crate) async fn process_file<S, P>(
  ctx: &WorkerContext<S, P>,
  path: &Path,
) -> FileReport
where
  S: ScrapeSource,
  P: CandidatePicker,
{
  let identity = match ctx.store.identity_for(path) {
    Ok(identity) => identity,
    Err(e) => {
      tracing::warn!("cannot identify {}: {e}", path.display());
      return report(path, FileOutcome::Skipped { reason: e.to_string() });
    }
  };

  let stem = path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.to_string_lossy().into_owned());
  let compare_title = romhoard_naming::compare_title(&stem, &ctx.aliases);

  if ctx.cache_only {
    if ctx.store.has_entries(&identity, None) {
      return report(path, FileOutcome::Found {
        record:     synthesize(ctx, &identity, path, None),
        from_cache: true,
      });
    }
    return report(path, FileOutcome::NotFound {
      compare_title,
      best_score: 0,
    });
  }

  if !ctx.run.refresh
    && ctx.store.has_entries(&identity, Some(ctx.source.name()))
  {
    return report(path, FileOutcome::Found {
      record:     synthesize(ctx, &identity, path, Some(ctx.source.name())),
      from_cache: true,
    });
  }

  // Query variants in order; the first that yields candidates wins.
  let mut candidates: Vec<Candidate> = Vec::new();
  for variant in romhoard_naming::search_variants(&compare_title) {
    let query = SearchQuery::new(variant, ctx.platform.clone());
    match search_with_retries(ctx, &query).await {
      SourceCall::Ok(found) if !found.is_empty() => {
        candidates = found;
        break;
      }
      SourceCall::Ok(_) => {}
      SourceCall::Exhausted => {
        return report(path, FileOutcome::NotFound {
          compare_title,
          best_score: 0,
        });
      }
      SourceCall::Fatal(reason) => return fatal(path, reason),
    }
  }
  if candidates.is_empty() {
    return report(path, FileOutcome::NotFound {
      compare_title,
      best_score: 0,
    });
  }

  let file_year = titles::year_in_name(&stem);
  let selected = match_engine::select_candidate(
    &candidates,
    &compare_title,
    file_year,
    ctx.source.profile(),
    &ctx.match_config,
  );

  let (winner_index, score) = match selected {
    Some(outcome) if outcome.score >= ctx.match_config.minimum_match => {
      (outcome.index, outcome.score)
    }
    below => {
      let best_score = below.map(|o| o.score).unwrap_or(0);
      let pairs =
        match_engine::rank(&candidates, &compare_title, &ctx.match_config);
      let ranked: Vec<RankedCandidate> = pairs
        .iter()
        .map(|&(index, score)| RankedCandidate {
          candidate: candidates[index].clone(),
          score,
        })
        .collect();
      match ctx.picker.pick(&compare_title, &ranked).await {
        // A manual confirmation counts as a full match.
        Some(choice) if choice < pairs.len() => (pairs[choice].0, 100),
        _ => {
          return report(path, FileOutcome::NotFound {
            compare_title,
            best_score,
          });
        }
      }
    }
  };

  let attributes = match fetch_with_retries(ctx, &candidates[winner_index])
    .await
  {
    SourceCall::Ok(attributes) => attributes,
    SourceCall::Exhausted => {
      return report(path, FileOutcome::NotFound {
        compare_title,
        best_score: score,
      });
    }
    SourceCall::Fatal(reason) => return fatal(path, reason),
  };

  commit_attributes(ctx, &identity, &attributes);

  let mut record = ctx.store.resolve_record(&identity, None);
  record.file_path = Some(path.to_string_lossy().into_owned());
  record.search_match = score;
  report(path, FileOutcome::Found { record, from_cache: false })
}

/// A cache-hit record; a record pulled straight from the store is a full
/// match by definition.
fn synthesize<S, P>(
  ctx: &WorkerContext<S, P>,
  identity: &str,
  path: &Path,
  source_filter: Option<&str>,
) -> GameRecord {
  let mut record = ctx.store.resolve_record(identity, source_filter);
  record.file_path = Some(path.to_string_lossy().into_owned());
  record.search_match = 100;
  record
}

/// Commit every non-empty fetched attribute under the backend's name.
/// Individual failures are warnings; the file still counts as found.
fn commit_attributes<S, P>(
  ctx: &WorkerContext<S, P>,
  identity: &str,
  attributes: &SourceAttributes,
) where
  S: ScrapeSource,
{
  let source = ctx.source.name();
  for (&kind, text) in &attributes.texts {
    if text.trim().is_empty() {
      continue;
    }
    let fact = NewFact::text(identity, kind, source, text.clone());
    if let Err(e) = ctx.store.add_fact(fact, ctx.run.refresh) {
      tracing::warn!("failed to record {identity}:{}: {e}", kind.as_str());
    }
  }
  for payload in &attributes.media {
    if payload.kind == ResourceKind::Video && !ctx.run.include_video {
      continue;
    }
    let fact = NewFact::media(
      identity,
      payload.kind,
      source,
      payload.data.clone(),
      payload.extension.clone(),
    );
    if let Err(e) = ctx.store.add_fact(fact, ctx.run.refresh) {
      tracing::warn!(
        "failed to record {identity}:{}: {e}",
        payload.kind.as_str()
      );
    }
  }
}

// ─── Backend calls with retry ────────────────────────────────────────────────

async fn search_with_retries<S, P>(
  ctx: &WorkerContext<S, P>,
  query: &SearchQuery,
) -> SourceCall<Vec<Candidate>>
where
  S: ScrapeSource,
{
  let mut attempts = 0usize;
  loop {
    ctx.gate.acquire().await;
    match ctx.source.search(query).await {
      Ok(candidates) => return SourceCall::Ok(candidates),
      Err(SourceError::Transient(reason)) => {
        attempts += 1;
        if attempts >= ctx.run.max_retries {
          tracing::warn!(
            "search \"{}\" failed after {attempts} attempts: {reason}",
            query.text
          );
          return SourceCall::Exhausted;
        }
        tokio::time::sleep(RETRY_BACKOFF * attempts as u32).await;
      }
      Err(SourceError::Fatal(reason)) => return SourceCall::Fatal(reason),
    }
  }
}

async fn fetch_with_retries<S, P>(
  ctx: &WorkerContext<S, P>,
  candidate: &Candidate,
) -> SourceCall<SourceAttributes>
where
  S: ScrapeSource,
{
  let mut attempts = 0usize;
  loop {
    ctx.gate.acquire().await;
    match ctx.source.fetch(candidate).await {
      Ok(attributes) => return SourceCall::Ok(attributes),
      Err(SourceError::Transient(reason)) => {
        attempts += 1;
        if attempts >= ctx.run.max_retries {
          tracing::warn!(
            "fetch for \"{}\" failed after {attempts} attempts: {reason}",
            candidate.title
          );
          return SourceCall::Exhausted;
        }
        tokio::time::sleep(RETRY_BACKOFF * attempts as u32).await;
      }
      Err(SourceError::Fatal(reason)) => return SourceCall::Fatal(reason),
    }
  }
}
