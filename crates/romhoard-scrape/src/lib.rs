//! The aggregation worker pool and match engine for RomHoard.
//!
//! This crate turns a queue of game files into committed facts: each file is
//! identified, searched against a [`ScrapeSource`](romhoard_core::source::ScrapeSource)
//! backend, its candidates ranked by the match engine, and the winner's
//! attributes written to the resource store. Per-file failures become
//! [`FileOutcome`] events, never errors; conditions that poison a whole run
//! surface as its [`RunHalt`] reason.

pub mod match_engine;
pub mod picker;
pub mod pool;
pub mod queue;
pub mod rate;
pub mod worker;

pub use pool::{RunHalt, RunStats, run};
pub use queue::WorkQueue;
pub use rate::RateGate;
pub use worker::{FileEvent, FileOutcome, WorkerContext};
