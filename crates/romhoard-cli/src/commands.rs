//! Subcommand implementations.
//!
//! Each command opens the store, does its work through the library crates,
//! and flushes before returning. Destructive commands (`purge`, `vacuum`)
//! confirm on the terminal unless `--yes` was passed.

use std::{
  io::{BufRead, Write as _},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context, Result, bail};
use romhoard_core::{fact::ResourceKind, source::ScrapeSource};
use romhoard_naming::AliasTable;
use romhoard_scrape::{
  FileEvent, FileOutcome, RateGate, RunHalt, RunStats, WorkQueue,
  WorkerContext,
};
use romhoard_store::{FlushScope, PurgeFilter, ResourceStore, StoreOptions};

use crate::{
  gamelist::GamelistBuilder,
  import_source::{IMPORT_SOURCE_NAME, ImportSource},
  picker::TerminalPicker,
  settings::{Settings, expand_tilde},
};

// ─── Argument structs ────────────────────────────────────────────────────────

#[derive(clap::Args)]
pub struct ScrapeArgs {
  /// Platform name, e.g. "snes"; defaults to the configured one.
  #[arg(short, long)]
  pub platform: Option<String>,

  /// Directory of game files; defaults to the configured input_dir.
  #[arg(short, long, value_name = "DIR")]
  pub input: Option<PathBuf>,

  /// Backend to aggregate from: "import" or "cache".
  #[arg(short, long, default_value = IMPORT_SOURCE_NAME)]
  pub source: String,

  /// Re-scrape files that already have facts from this backend.
  #[arg(long)]
  pub refresh: bool,

  /// Prompt on below-threshold matches instead of skipping them.
  #[arg(long)]
  pub interactive: bool,

  /// Fetch video media and count it toward completeness.
  #[arg(long)]
  pub include_video: bool,

  /// Worker count override.
  #[arg(long)]
  pub workers: Option<usize>,

  /// Only process files whose name matches one of these patterns.
  #[arg(long, value_name = "GLOB")]
  pub include: Vec<String>,

  /// Skip files whose name matches one of these patterns.
  #[arg(long, value_name = "GLOB")]
  pub exclude: Vec<String>,
}

#[derive(clap::Args)]
pub struct PurgeArgs {
  /// Only facts recorded by this source.
  #[arg(long)]
  pub source: Option<String>,

  /// Only facts of this kind, e.g. "cover".
  #[arg(long)]
  pub kind: Option<String>,

  /// Purge every fact in the store.
  #[arg(long, conflicts_with_all = ["source", "kind"])]
  pub all: bool,

  /// Skip the confirmation prompt.
  #[arg(short, long)]
  pub yes: bool,
}

#[derive(clap::Args)]
pub struct VacuumArgs {
  /// Directory of game files; defaults to the configured input_dir.
  #[arg(short, long, value_name = "DIR")]
  pub input: Option<PathBuf>,

  /// Skip the confirmation prompt.
  #[arg(short, long)]
  pub yes: bool,
}

#[derive(clap::Args)]
pub struct MergeArgs {
  /// Root directory of the store to import from.
  pub from: PathBuf,

  /// Overwrite facts whose slot is already taken locally.
  #[arg(long)]
  pub overwrite: bool,
}

#[derive(clap::Args)]
pub struct ReportArgs {
  /// Comma-separated kinds to report on, e.g. "cover,screenshot".
  #[arg(long, value_delimiter = ',', required = true)]
  pub missing: Vec<String>,
}

#[derive(clap::Args)]
pub struct ExportArgs {
  /// Directory of game files; defaults to the configured input_dir.
  #[arg(short, long, value_name = "DIR")]
  pub input: Option<PathBuf>,

  /// Output path; defaults to gamelist.xml inside the input directory.
  #[arg(short, long, value_name = "FILE")]
  pub output: Option<PathBuf>,
}

// ─── Shared plumbing ─────────────────────────────────────────────────────────

async fn open_store(settings: &Settings) -> Result<ResourceStore> {
  let options = StoreOptions {
    priority: settings.priority.clone(),
    identity: settings.identity.clone(),
    ..StoreOptions::default()
  };
  let store = ResourceStore::open(&settings.store_root, options)
    .await
    .with_context(|| {
      format!("opening store at {}", settings.store_root.display())
    })?;
  let report = store.read().await.context("loading store")?;
  tracing::info!(
    "store loaded: {} facts, {} quick-ids, {} dropped",
    report.facts,
    report.quick_ids,
    report.dropped
  );
  Ok(store)
}

/// The game files of one directory: top-level regular files, sorted, with
/// dotfiles and any previous gamelist.xml left out.
fn scan_input(dir: &Path) -> Result<Vec<PathBuf>> {
  let entries = std::fs::read_dir(dir)
    .with_context(|| format!("reading input directory {}", dir.display()))?;
  let mut files = Vec::new();
  for entry in entries {
    let path = entry?.path();
    if !path.is_file() {
      continue;
    }
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
    else {
      continue;
    };
    if name.starts_with('.') || name == "gamelist.xml" {
      continue;
    }
    files.push(path);
  }
  files.sort();
  Ok(files)
}

fn input_dir(settings: &Settings, flag: Option<PathBuf>) -> Result<PathBuf> {
  flag
    .or_else(|| settings.input_dir.clone())
    .map(|p| expand_tilde(&p))
    .context("no input directory; pass --input or set input_dir")
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
  if assume_yes {
    return Ok(true);
  }
  print!("{prompt} [y/N]: ");
  std::io::stdout().flush().ok();
  let mut line = String::new();
  std::io::stdin().lock().read_line(&mut line)?;
  Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

// ─── scrape ──────────────────────────────────────────────────────────────────

pub async fn scrape(settings: Settings, args: ScrapeArgs) -> Result<()> {
  let cache_only = match args.source.as_str() {
    IMPORT_SOURCE_NAME => false,
    "cache" => true,
    other => {
      bail!("unknown source \"{other}\" (expected \"import\" or \"cache\")")
    }
  };
  let input = input_dir(&settings, args.input)?;
  let platform = args
    .platform
    .or_else(|| settings.platform.clone())
    .context("no platform; pass --platform or set platform")?;

  let files = scan_input(&input)?;
  if files.is_empty() {
    println!("nothing to scrape in {}", input.display());
    return Ok(());
  }

  let store = Arc::new(open_store(&settings).await?);
  let aliases_path = settings.aliases_path();
  let aliases = AliasTable::load(&aliases_path)
    .with_context(|| format!("loading alias table {}", aliases_path.display()))?;
  if !aliases.is_empty() {
    tracing::info!("alias table: {} entries", aliases.len());
  }

  let source = ImportSource::open(&settings.import_root())?;
  let interval = source.profile().request_interval_ms;

  let mut run = settings.run.clone();
  run.refresh = run.refresh || args.refresh;
  run.include_video = run.include_video || args.include_video;
  if let Some(workers) = args.workers {
    run.workers = workers;
  }

  let queue = WorkQueue::new(files);
  if !args.include.is_empty() || !args.exclude.is_empty() {
    let remaining = queue.filter(&args.include, &args.exclude);
    tracing::info!("{remaining} files after include/exclude filters");
  }

  let ctx = WorkerContext {
    store: store.clone(),
    source: Arc::new(source),
    queue: Arc::new(queue),
    gate: Arc::new(RateGate::new(interval)),
    picker: Arc::new(TerminalPicker::new(args.interactive)),
    aliases: Arc::new(aliases),
    platform,
    match_config: settings.matching.clone(),
    run,
    cache_only,
  };

  let (events, mut results) = tokio::sync::mpsc::unbounded_channel();
  let printer = tokio::spawn(async move {
    while let Some(event) = results.recv().await {
      print_event(&event);
    }
  });

  let stats = romhoard_scrape::run(ctx, events).await;
  let _ = printer.await;

  // Flush before reporting the halt so committed facts survive an abort.
  store.write(FlushScope::All).await.context("flushing store")?;

  print_summary(&stats);
  if let RunHalt::SourceFailure(reason) = &stats.halt {
    bail!("run aborted: {reason}");
  }
  Ok(())
}

fn print_event(event: &FileEvent) {
  let name = event
    .file_path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| event.file_path.to_string_lossy().into_owned());
  match &event.outcome {
    FileOutcome::Found { record, from_cache } => {
      let title = record.title().unwrap_or("<untitled>");
      let origin = if *from_cache { ", cached" } else { "" };
      println!("  found     {name}: \"{title}\" ({}%{origin})", record.search_match);
    }
    FileOutcome::NotFound { compare_title, best_score } => {
      println!(
        "  not found {name}: \"{compare_title}\" (best {best_score}%)"
      );
    }
    FileOutcome::Skipped { reason } => {
      println!("  skipped   {name}: {reason}");
    }
  }
}

fn print_summary(stats: &RunStats) {
  let elapsed = (stats.finished_at - stats.started_at).num_seconds();
  println!();
  println!(
    "run {}: {} found ({} cached), {} not found, {} skipped of {} queued in {elapsed}s",
    stats.run_id,
    stats.found,
    stats.from_cache,
    stats.not_found,
    stats.skipped,
    stats.queued
  );
  println!(
    "average match {}%, average completeness {}%",
    stats.average_match, stats.average_completeness
  );
  match &stats.halt {
    RunHalt::QueueDrained => {}
    RunHalt::ConsecutiveMisses(n) => {
      println!("aborted after {n} consecutive misses");
    }
    RunHalt::BudgetExhausted => {
      println!("aborted: request budget exhausted");
    }
    RunHalt::SourceFailure(reason) => {
      println!("aborted: {reason}");
    }
  }
}

// ─── purge ───────────────────────────────────────────────────────────────────

pub async fn purge(settings: Settings, args: PurgeArgs) -> Result<()> {
  let kind = args
    .kind
    .as_deref()
    .map(ResourceKind::parse)
    .transpose()
    .context("unknown resource kind")?;
  if args.source.is_none() && kind.is_none() && !args.all {
    bail!("nothing selected; pass --source, --kind, or --all");
  }

  let store = open_store(&settings).await?;
  let filter = PurgeFilter { source: args.source, kind };

  let mut parts = Vec::new();
  if let Some(source) = &filter.source {
    parts.push(format!("source \"{source}\""));
  }
  if let Some(kind) = filter.kind {
    parts.push(format!("kind \"{}\"", kind.as_str()));
  }
  let scope = if parts.is_empty() {
    format!("all {} facts", store.fact_count())
  } else {
    format!("facts with {}", parts.join(" and "))
  };
  if !confirm(&format!("purge {scope}?"), args.yes)? {
    println!("aborted");
    return Ok(());
  }

  let report = store.purge(&filter);
  store.write(FlushScope::All).await.context("flushing store")?;
  println!(
    "purged {} facts, {} kept because their media could not be deleted",
    report.removed, report.failed
  );
  Ok(())
}

// ─── vacuum ──────────────────────────────────────────────────────────────────

pub async fn vacuum(settings: Settings, args: VacuumArgs) -> Result<()> {
  let input = input_dir(&settings, args.input)?;
  let files = scan_input(&input)?;
  let store = open_store(&settings).await?;

  let prompt = format!(
    "drop facts for games not among the {} files of {}?",
    files.len(),
    input.display()
  );
  if !confirm(&prompt, args.yes)? {
    println!("aborted");
    return Ok(());
  }

  let report = store.vacuum(&files);
  store.write(FlushScope::All).await.context("flushing store")?;
  println!(
    "vacuumed {} facts and {} quick-ids ({} failures)",
    report.facts_removed, report.quick_ids_removed, report.failed
  );
  Ok(())
}

// ─── validate ────────────────────────────────────────────────────────────────

pub async fn validate(settings: Settings) -> Result<()> {
  let store = open_store(&settings).await?;
  let report = store.validate()?;
  println!(
    "removed {} orphaned media files, {} could not be deleted",
    report.orphans_removed, report.failed
  );
  Ok(())
}

// ─── merge ───────────────────────────────────────────────────────────────────

pub async fn merge(settings: Settings, args: MergeArgs) -> Result<()> {
  let other = expand_tilde(&args.from);
  let store = open_store(&settings).await?;
  let report = store
    .merge(&other, args.overwrite)
    .await
    .with_context(|| format!("merging from {}", other.display()))?;
  store.write(FlushScope::All).await.context("flushing store")?;
  println!(
    "merged {} facts, {} skipped, {} failed",
    report.imported, report.skipped, report.failed
  );
  Ok(())
}

// ─── report ──────────────────────────────────────────────────────────────────

pub async fn report(settings: Settings, args: ReportArgs) -> Result<()> {
  let mut kinds = Vec::new();
  for name in &args.missing {
    kinds.push(
      ResourceKind::parse(name)
        .with_context(|| format!("unknown resource kind \"{name}\""))?,
    );
  }

  let store = open_store(&settings).await?;
  let missing = store.missing(&kinds);
  for (kind, identities) in &missing {
    println!("{} missing for {} games:", kind.as_str(), identities.len());
    for identity in identities {
      // Show the file path when the quick-id index still knows it.
      match store.path_of(identity) {
        Some(path) => println!("  {path}"),
        None => println!("  {identity}"),
      }
    }
  }
  Ok(())
}

// ─── export ──────────────────────────────────────────────────────────────────

pub async fn export(settings: Settings, args: ExportArgs) -> Result<()> {
  let input = input_dir(&settings, args.input)?;
  let files = scan_input(&input)?;
  let store = open_store(&settings).await?;

  let mut builder = GamelistBuilder::new();
  let mut exported = 0usize;
  let mut skipped = 0usize;
  for path in &files {
    let identity = match store.identity_for(path) {
      Ok(identity) => identity,
      Err(e) => {
        tracing::warn!("skipping {}: {e}", path.display());
        skipped += 1;
        continue;
      }
    };
    let record = store.resolve_record(&identity, None);
    builder.game(path, &record, store.media());
    exported += 1;
  }

  let output = args
    .output
    .map(|p| expand_tilde(&p))
    .unwrap_or_else(|| input.join("gamelist.xml"));
  std::fs::write(&output, builder.finish())
    .with_context(|| format!("writing {}", output.display()))?;
  println!(
    "wrote {} with {exported} entries ({skipped} skipped)",
    output.display()
  );

  // identity_for may have refreshed the quick-id index; keep it.
  store
    .write(FlushScope::QuickIdsOnly)
    .await
    .context("flushing store")?;
  Ok(())
}
