//! The on-disk media tree and the media-processing seam.
//!
//! Binary fact values are paths relative to the tree root, laid out as
//! `kind/source/identity[.ext]`. Writes go through a temp file and a rename
//! so a crash mid-write never leaves a torn file at a fact's path.

use std::{
  io,
  path::{Path, PathBuf},
};

use bytes::Bytes;
use romhoard_core::fact::ResourceKind;
use uuid::Uuid;

use crate::{Error, Result};

// ─── MediaProcessor ──────────────────────────────────────────────────────────

/// Transformation applied to raw media bytes before they land in the tree
/// (resize, re-encode, convert). The store only requires that the output is
/// what should be persisted.
pub trait MediaProcessor: Send + Sync {
  fn process(&self, kind: ResourceKind, data: Bytes) -> Result<Bytes>;
}

/// The default processor: bytes in, bytes out.
pub struct Passthrough;

impl MediaProcessor for Passthrough {
  fn process(&self, _kind: ResourceKind, data: Bytes) -> Result<Bytes> {
    Ok(data)
  }
}

// ─── MediaTree ───────────────────────────────────────────────────────────────

/// Path arithmetic and file operations for one store's media subtree.
pub struct MediaTree {
  root: PathBuf,
}

impl MediaTree {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// The relative path a fact's media lives at. Uses `/` separators
  /// regardless of platform; the value is persisted verbatim.
  pub fn relative_path(
    kind: ResourceKind,
    source: &str,
    identity: &str,
    extension: Option<&str>,
  ) -> String {
    match extension.filter(|_| kind.keeps_extension()) {
      Some(ext) => format!("{}/{source}/{identity}.{ext}", kind.as_str()),
      None => format!("{}/{source}/{identity}", kind.as_str()),
    }
  }

  pub fn absolute(&self, relative: &str) -> PathBuf { self.root.join(relative) }

  pub fn exists(&self, relative: &str) -> bool {
    self.absolute(relative).is_file()
  }

  /// Write `data` at `relative`, creating parent directories. The data goes
  /// to a uniquely-named sibling first and is renamed into place.
  pub fn write(&self, relative: &str, data: &[u8]) -> Result<()> {
    let target = self.absolute(relative);
    if let Some(parent) = target.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let tmp = target.with_file_name(format!(
      "{}.{}.tmp",
      target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("media"),
      Uuid::new_v4().simple(),
    ));

    std::fs::write(&tmp, data)?;
    if let Err(e) = std::fs::rename(&tmp, &target) {
      let _ = std::fs::remove_file(&tmp);
      return Err(e.into());
    }
    Ok(())
  }

  /// Delete the file at `relative`. A file that is already gone counts as
  /// removed.
  pub fn remove(&self, relative: &str) -> Result<()> {
    match std::fs::remove_file(self.absolute(relative)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  /// Copy one file from another tree into this one, same relative path.
  pub fn copy_from(&self, other: &MediaTree, relative: &str) -> Result<()> {
    let source = other.absolute(relative);
    let data = std::fs::read(&source)?;
    self.write(relative, &data)
  }

  /// Every file currently in the tree, as relative paths with `/`
  /// separators. Temp files from interrupted writes are skipped.
  pub fn walk(&self) -> Result<Vec<String>> {
    let mut found = Vec::new();
    if !self.root.is_dir() {
      return Ok(found);
    }
    let mut pending = vec![self.root.clone()];
    while let Some(dir) = pending.pop() {
      for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
          pending.push(path);
        } else if let Ok(rel) = path.strip_prefix(&self.root) {
          let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
          if !rel.ends_with(".tmp") {
            found.push(rel);
          }
        }
      }
    }
    found.sort();
    Ok(found)
  }
}

// Error conversion used by `MediaProcessor` implementations that shell out
// to external tooling.
impl Error {
  pub fn media_process(message: impl Into<String>) -> Self {
    Error::MediaProcess(message.into())
  }
}
