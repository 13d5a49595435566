//! Error types for `romhoard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown resource kind: {0:?}")]
  UnknownResourceKind(String),

  #[error("textual payload supplied for binary kind {0:?}")]
  ExpectedMedia(String),

  #[error("media payload supplied for textual kind {0:?}")]
  ExpectedText(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
