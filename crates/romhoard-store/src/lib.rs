//! SQLite-backed resource store for RomHoard.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Media payloads live in a plain
//! file tree beside the database rather than as blobs inside it.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod identity;
pub mod media;

pub use error::{Error, Result};
pub use store::{
  AddOutcome, FlushScope, LoadReport, MergeReport, PurgeFilter, PurgeReport,
  ResourceStore, StoreOptions, VacuumReport, ValidateReport,
};

#[cfg(test)]
mod tests;
