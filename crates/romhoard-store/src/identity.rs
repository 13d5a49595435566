//! The identity function: files to stable cache-identity strings.
//!
//! Identities are lowercase SHA-256 hex digests. Content is hashed where
//! practical; zero-byte, oversized, and format-fragile files hash their
//! filename stem instead, so the identity stays stable across runs without
//! re-reading content that may shift or cost too much.

use std::{
  fs::File,
  io::Read,
  path::Path,
};

use romhoard_core::config::IdentityPolicy;
use sha2::{Digest, Sha256};

use crate::Result;

/// Compute the cache identity for `path` under `policy`.
pub fn compute_identity(path: &Path, policy: &IdentityPolicy) -> Result<String> {
  let metadata = std::fs::metadata(path)?;
  let extension = path
    .extension()
    .and_then(|e| e.to_str())
    .unwrap_or_default();

  if policy.hashes_by_filename(extension, metadata.len()) {
    let stem = path
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or_default();
    Ok(hash_text(stem))
  } else {
    hash_file(path)
  }
}

/// SHA-256 of a UTF-8 string, lowercase hex.
pub fn hash_text(text: &str) -> String {
  hex::encode(Sha256::digest(text.as_bytes()))
}

fn hash_file(path: &Path) -> Result<String> {
  let mut file = File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buf = [0u8; 64 * 1024];
  loop {
    let n = file.read(&mut buf)?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
  }
  Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_file(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn content_hash_is_stable_and_name_independent() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.sfc", b"same content");
    let b = write_file(dir.path(), "b.sfc", b"same content");
    let c = write_file(dir.path(), "c.sfc", b"other content");

    let policy = IdentityPolicy::default();
    let id_a = compute_identity(&a, &policy).unwrap();
    let id_b = compute_identity(&b, &policy).unwrap();
    let id_c = compute_identity(&c, &policy).unwrap();

    assert_eq!(id_a, id_b);
    assert_ne!(id_a, id_c);
    assert_eq!(id_a.len(), 64);
    assert!(id_a.bytes().all(|b| b.is_ascii_hexdigit()));
  }

  #[test]
  fn fragile_formats_hash_the_stem() {
    let dir = tempfile::tempdir().unwrap();
    let zip = write_file(dir.path(), "game.zip", b"payload one");

    let policy = IdentityPolicy::default();
    let id = compute_identity(&zip, &policy).unwrap();
    assert_eq!(id, hash_text("game"));

    // Different stem, different identity, regardless of content.
    let other = write_file(dir.path(), "other.zip", b"payload one");
    assert_ne!(compute_identity(&other, &policy).unwrap(), id);
  }

  #[test]
  fn zero_byte_files_hash_the_stem() {
    let dir = tempfile::tempdir().unwrap();
    let empty = write_file(dir.path(), "empty.sfc", b"");

    let policy = IdentityPolicy::default();
    assert_eq!(
      compute_identity(&empty, &policy).unwrap(),
      hash_text("empty")
    );
  }

  #[test]
  fn oversized_files_hash_the_stem() {
    let dir = tempfile::tempdir().unwrap();
    let big = write_file(dir.path(), "big.iso", b"tiny but capped");

    let policy = IdentityPolicy {
      max_content_bytes: 4,
      ..IdentityPolicy::default()
    };
    assert_eq!(compute_identity(&big, &policy).unwrap(), hash_text("big"));
  }
}
