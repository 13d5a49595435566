//! The worker pool: drives [`process_file`] over the queue and decides when
//! the run as a whole must stop.
//!
//! Halting is cooperative. A worker that trips a run-level condition records
//! the halt reason and clears the queue; in-flight files on other workers
//! finish normally and their results still count.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use romhoard_core::source::ScrapeSource;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::{
  picker::CandidatePicker,
  worker::{FileEvent, FileOutcome, WorkerContext, process_file},
};

// ─── Run results ─────────────────────────────────────────────────────────────

/// Why the run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunHalt {
  /// Every queued file was processed.
  QueueDrained,
  /// Too many not-found results in a row; the queue was abandoned.
  ConsecutiveMisses(usize),
  /// The backend's request budget hit zero.
  BudgetExhausted,
  /// A fatal backend failure. Facts committed before it are preserved.
  SourceFailure(String),
}

/// Aggregate accounting for one run.
#[derive(Debug, Clone)]
pub struct RunStats {
  pub run_id:               Uuid,
  /// Queue length at the start of the run.
  pub queued:               usize,
  pub found:                usize,
  pub not_found:            usize,
  pub skipped:              usize,
  /// How many of `found` were served from the cache.
  pub from_cache:           usize,
  /// Mean match score over found files, 0 when nothing was found.
  pub average_match:        u8,
  pub average_completeness: u8,
  pub halt:                 RunHalt,
  pub started_at:           DateTime<Utc>,
  pub finished_at:          DateTime<Utc>,
}

/// Mutable mid-run state shared by the workers.
#[derive(Default)]
struct RunTally {
  found:              usize,
  not_found:          usize,
  skipped:            usize,
  from_cache:         usize,
  match_total:        u64,
  completeness_total: u64,
  /// Reset by every found file, untouched by skips.
  consecutive_misses: usize,
  /// First halt reason wins; later conditions keep it.
  halt:               Option<RunHalt>,
}

// ─── The pool ────────────────────────────────────────────────────────────────

/// Process the whole queue and return the run's accounting. Per-file results
/// stream out over `events` as they land; send failures are ignored so an
/// abandoned receiver never stalls the run.
pub async fn run<S, P>(
  ctx: WorkerContext<S, P>,
  events: UnboundedSender<FileEvent>,
) -> RunStats
where
  S: ScrapeSource + 'static,
  P: CandidatePicker + 'static,
{
  let run_id = Uuid::new_v4();
  let started_at = Utc::now();
  let queued = ctx.queue.len();
  let worker_count =
    effective_worker_count(ctx.run.workers, ctx.gate.is_throttled());
  tracing::info!(
    "run {run_id}: {queued} files queued for \"{}\", {worker_count} workers",
    ctx.source.name()
  );

  let tally = Arc::new(Mutex::new(RunTally::default()));
  let handles: Vec<_> = (0..worker_count)
    .map(|_| {
      tokio::spawn(worker_loop(ctx.clone(), tally.clone(), events.clone()))
    })
    .collect();
  for handle in handles {
    let _ = handle.await;
  }

  let tally = tally.lock().unwrap();
  let stats = RunStats {
    run_id,
    queued,
    found: tally.found,
    not_found: tally.not_found,
    skipped: tally.skipped,
    from_cache: tally.from_cache,
    average_match: mean(tally.match_total, tally.found),
    average_completeness: mean(tally.completeness_total, tally.found),
    halt: tally.halt.clone().unwrap_or(RunHalt::QueueDrained),
    started_at,
    finished_at: Utc::now(),
  };
  tracing::info!(
    "run {run_id} finished: {} found ({} cached), {} not found, {} skipped",
    stats.found,
    stats.from_cache,
    stats.not_found,
    stats.skipped
  );
  stats
}

/// Rate-limited backends serialize on the gate anyway; extra workers would
/// only sit in its queue, so the pool collapses to one.
fn effective_worker_count(workers: usize, throttled: bool) -> usize {
  if throttled { 1 } else { workers.max(1) }
}

fn mean(total: u64, count: usize) -> u8 {
  if count == 0 { 0 } else { (total / count as u64) as u8 }
}

async fn worker_loop<S, P>(
  ctx: WorkerContext<S, P>,
  tally: Arc<Mutex<RunTally>>,
  events: UnboundedSender<FileEvent>,
) where
  S: ScrapeSource,
  P: CandidatePicker,
{
  while let Some(path) = ctx.queue.take() {
    let report = process_file(&ctx, &path).await;

    // The queue clear happens outside the tally lock.
    let mut clear_queue = false;
    {
      let mut tally = tally.lock().unwrap();
      match &report.event.outcome {
        FileOutcome::Found { record, from_cache } => {
          tally.found += 1;
          tally.match_total += u64::from(record.search_match);
          tally.completeness_total +=
            u64::from(record.completeness(ctx.run.include_video));
          if *from_cache {
            tally.from_cache += 1;
          }
          tally.consecutive_misses = 0;
        }
        FileOutcome::NotFound { .. } => {
          tally.not_found += 1;
          tally.consecutive_misses += 1;
          if tally.consecutive_misses >= ctx.run.max_consecutive_miss
            && tally.halt.is_none()
          {
            tally.halt =
              Some(RunHalt::ConsecutiveMisses(tally.consecutive_misses));
            clear_queue = true;
          }
        }
        FileOutcome::Skipped { .. } => {
          tally.skipped += 1;
        }
      }
      if let Some(reason) = &report.fatal {
        if tally.halt.is_none() {
          tally.halt = Some(RunHalt::SourceFailure(reason.clone()));
        }
        clear_queue = true;
      }
    }
    if clear_queue {
      let dropped = ctx.queue.clear();
      if dropped > 0 {
        tracing::warn!("run aborted, {dropped} queued files dropped");
      }
    }

    let _ = events.send(report.event);

    if ctx.source.requests_remaining() == 0 {
      {
        let mut tally = tally.lock().unwrap();
        if tally.halt.is_none() {
          tally.halt = Some(RunHalt::BudgetExhausted);
        }
      }
      let dropped = ctx.queue.clear();
      if dropped > 0 {
        tracing::info!(
          "request budget exhausted, {dropped} queued files dropped"
        );
      }
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
