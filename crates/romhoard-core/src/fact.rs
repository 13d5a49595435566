//! Fact types — the fundamental unit of the RomHoard resource store.
//!
//! A fact is one attribute value from one source for one file identity. At
//! most one fact exists per `(identity, kind, source)` triple; re-adding
//! under the same triple either overwrites (refresh) or is rejected.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::{Error, Result};

/// Reserved source name for manually entered facts. Always wins resolution
/// regardless of the configured priority ordering.
pub const USER_SOURCE: &str = "user";

// ─── ResourceKind ────────────────────────────────────────────────────────────

/// The attribute a fact describes. The variant name (snake_cased) serves as
/// the `kind` discriminant in the persisted store and as the top-level
/// directory name in the media tree for binary kinds.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  // ── Textual ──────────────────────────────────────────────────────────────
  Title,
  Platform,
  Description,
  Developer,
  Publisher,
  Players,
  Ages,
  Tags,
  Rating,
  ReleaseDate,

  // ── Binary (value is a relative path into the media tree) ────────────────
  Cover,
  Screenshot,
  Wheel,
  Marquee,
  Texture,
  Video,
  Manual,
}

impl ResourceKind {
  /// The discriminant string stored in the `kind` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Title => "title",
      Self::Platform => "platform",
      Self::Description => "description",
      Self::Developer => "developer",
      Self::Publisher => "publisher",
      Self::Players => "players",
      Self::Ages => "ages",
      Self::Tags => "tags",
      Self::Rating => "rating",
      Self::ReleaseDate => "release_date",
      Self::Cover => "cover",
      Self::Screenshot => "screenshot",
      Self::Wheel => "wheel",
      Self::Marquee => "marquee",
      Self::Texture => "texture",
      Self::Video => "video",
      Self::Manual => "manual",
    }
  }

  /// Parse a discriminant string back into a kind.
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "title" => Ok(Self::Title),
      "platform" => Ok(Self::Platform),
      "description" => Ok(Self::Description),
      "developer" => Ok(Self::Developer),
      "publisher" => Ok(Self::Publisher),
      "players" => Ok(Self::Players),
      "ages" => Ok(Self::Ages),
      "tags" => Ok(Self::Tags),
      "rating" => Ok(Self::Rating),
      "release_date" => Ok(Self::ReleaseDate),
      "cover" => Ok(Self::Cover),
      "screenshot" => Ok(Self::Screenshot),
      "wheel" => Ok(Self::Wheel),
      "marquee" => Ok(Self::Marquee),
      "texture" => Ok(Self::Texture),
      "video" => Ok(Self::Video),
      "manual" => Ok(Self::Manual),
      other => Err(Error::UnknownResourceKind(other.to_string())),
    }
  }

  /// Whether this kind's `value` is a relative media path rather than
  /// attribute text.
  pub fn is_binary(&self) -> bool {
    matches!(
      self,
      Self::Cover
        | Self::Screenshot
        | Self::Wheel
        | Self::Marquee
        | Self::Texture
        | Self::Video
        | Self::Manual
    )
  }

  /// Whether media files of this kind keep their original file extension.
  /// Images are stored bare (the identity alone names the file); video keeps
  /// its container extension so players can probe it.
  pub fn keeps_extension(&self) -> bool {
    matches!(self, Self::Video)
  }

  /// Every kind, textual first, in declaration order.
  pub fn all() -> impl Iterator<Item = ResourceKind> {
    <Self as strum::IntoEnumIterator>::iter()
  }
}

// ─── ResourceFact ────────────────────────────────────────────────────────────

/// One persisted attribute value from one source for one identity.
///
/// For textual kinds, `value` is the attribute text. For binary kinds it is a
/// path relative to the store's media tree (`kind/source/identity[.ext]`);
/// no binary data lives in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceFact {
  pub identity:    String,
  pub kind:        ResourceKind,
  /// Name of the producing backend, or [`USER_SOURCE`].
  pub source:      String,
  pub value:       String,
  /// Store-assigned creation time; the default resolution tie-breaker.
  pub recorded_at: DateTime<Utc>,
}

impl ResourceFact {
  /// Whether this fact occupies the same `(identity, kind, source)` slot as
  /// another.
  pub fn same_slot(&self, other: &ResourceFact) -> bool {
    self.identity == other.identity
      && self.kind == other.kind
      && self.source == other.source
  }
}

// ─── NewFact ─────────────────────────────────────────────────────────────────

/// The payload of a fact before it is persisted. Binary payloads carry the
/// raw bytes; the store writes them to the media tree and records the
/// resulting relative path as the fact's `value`.
#[derive(Debug, Clone)]
pub enum FactBody {
  Text(String),
  Media {
    data:      Bytes,
    /// Original file extension (without the dot), kept only for kinds where
    /// [`ResourceKind::keeps_extension`] is true.
    extension: Option<String>,
  },
}

/// Input to the store's fact-recording operation. `recorded_at` is always
/// set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewFact {
  pub identity: String,
  pub kind:     ResourceKind,
  pub source:   String,
  pub body:     FactBody,
}

impl NewFact {
  pub fn text(
    identity: impl Into<String>,
    kind: ResourceKind,
    source: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    Self {
      identity: identity.into(),
      kind,
      source: source.into(),
      body: FactBody::Text(value.into()),
    }
  }

  pub fn media(
    identity: impl Into<String>,
    kind: ResourceKind,
    source: impl Into<String>,
    data: Bytes,
    extension: Option<String>,
  ) -> Self {
    Self {
      identity: identity.into(),
      kind,
      source: source.into(),
      body: FactBody::Media { data, extension },
    }
  }

  /// Validate that the body shape matches the kind (text for textual kinds,
  /// media for binary kinds).
  pub fn check_shape(&self) -> Result<()> {
    match (&self.body, self.kind.is_binary()) {
      (FactBody::Text(_), true) => {
        Err(Error::ExpectedMedia(self.kind.as_str().to_string()))
      }
      (FactBody::Media { .. }, false) => {
        Err(Error::ExpectedText(self.kind.as_str().to_string()))
      }
      _ => Ok(()),
    }
  }
}

// ─── QuickIdEntry ────────────────────────────────────────────────────────────

/// Side index entry mapping a file path to its last computed identity.
/// Valid only while `checked_at` is at or after the file's current
/// modification time; otherwise the identity must be recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickIdEntry {
  pub file_path:  String,
  pub checked_at: DateTime<Utc>,
  pub identity:   String,
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn kind_discriminants_round_trip() {
    for kind in ResourceKind::iter() {
      assert_eq!(ResourceKind::parse(kind.as_str()).unwrap(), kind);
    }
  }

  #[test]
  fn unknown_kind_is_rejected() {
    assert!(matches!(
      ResourceKind::parse("boxart"),
      Err(Error::UnknownResourceKind(_))
    ));
  }

  #[test]
  fn binary_split_matches_taxonomy() {
    let binary: Vec<_> =
      ResourceKind::iter().filter(ResourceKind::is_binary).collect();
    assert_eq!(binary.len(), 7);
    assert!(binary.contains(&ResourceKind::Cover));
    assert!(!ResourceKind::Title.is_binary());
    assert!(!ResourceKind::ReleaseDate.is_binary());
  }

  #[test]
  fn only_video_keeps_extension() {
    for kind in ResourceKind::iter() {
      assert_eq!(kind.keeps_extension(), kind == ResourceKind::Video);
    }
  }

  #[test]
  fn shape_check_rejects_mismatched_bodies() {
    let text_for_binary =
      NewFact::text("abc", ResourceKind::Cover, "openretro", "oops");
    assert!(text_for_binary.check_shape().is_err());

    let media_for_text = NewFact::media(
      "abc",
      ResourceKind::Title,
      "openretro",
      Bytes::from_static(b"\x89PNG"),
      None,
    );
    assert!(media_for_text.check_shape().is_err());

    let ok = NewFact::text("abc", ResourceKind::Title, "openretro", "Zelda");
    assert!(ok.check_shape().is_ok());
  }
}
