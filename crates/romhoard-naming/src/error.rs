//! Error types for `romhoard-naming`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read alias table: {0}")]
  Io(#[from] std::io::Error),

  #[error("malformed alias table: {0}")]
  AliasParse(#[from] toml::de::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
