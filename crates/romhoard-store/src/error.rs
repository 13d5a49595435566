//! Error type for `romhoard-store`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] romhoard_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("media processing failed: {0}")]
  MediaProcess(String),

  #[error("no store found at {0}")]
  NoSuchStore(std::path::PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
