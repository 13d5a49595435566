//! `romhoard` — game metadata and artwork aggregation for emulator
//! front-ends.
//!
//! # Usage
//!
//! ```
//! romhoard scrape --platform snes --input ~/roms/snes
//! romhoard export --input ~/roms/snes
//! romhoard report --missing cover,screenshot
//! ```
//!
//! Configuration is layered: `~/.romhoard/config.toml` (or `--config`),
//! `ROMHOARD_`-prefixed environment variables, then command-line flags.

mod commands;
mod gamelist;
mod import_source;
mod picker;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
  ExportArgs, MergeArgs, PurgeArgs, ReportArgs, ScrapeArgs, VacuumArgs,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "romhoard", about = "Game metadata and artwork aggregator")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Resource store directory (overrides the config file).
  #[arg(long, value_name = "DIR")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Aggregate metadata and artwork for the files of an input directory.
  Scrape(ScrapeArgs),
  /// Delete facts matching a source/kind filter, media included.
  Purge(PurgeArgs),
  /// Drop facts for games no longer present in the input directory.
  Vacuum(VacuumArgs),
  /// Delete media files no fact references.
  Validate,
  /// Import every fact from another store.
  Merge(MergeArgs),
  /// List games missing values for the given kinds.
  Report(ReportArgs),
  /// Write an EmulationStation gamelist.xml for an input directory.
  Export(ExportArgs),
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = settings::Settings::load(cli.config.as_deref(), cli.store)?;

  match cli.command {
    Command::Scrape(args) => commands::scrape(settings, args).await,
    Command::Purge(args) => commands::purge(settings, args).await,
    Command::Vacuum(args) => commands::vacuum(settings, args).await,
    Command::Validate => commands::validate(settings).await,
    Command::Merge(args) => commands::merge(settings, args).await,
    Command::Report(args) => commands::report(settings, args).await,
    Command::Export(args) => commands::export(settings, args).await,
  }
}
