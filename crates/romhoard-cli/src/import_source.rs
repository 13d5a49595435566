//! A `ScrapeSource` over a local import directory.
//!
//! Each game is one `<title>.json` definition file; referenced media files
//! live next to it (paths relative to the import directory). A search
//! matches the query text against definition file stems, case-insensitively
//! and at most one result, so the backend declares single-result
//! cardinality and the match engine trusts it outright.
//!
//! ```json
//! {
//!   "title": "Super Metroid",
//!   "release_year": 1994,
//!   "texts": { "description": "...", "developer": "Nintendo" },
//!   "media": { "cover": "Super Metroid.png" }
//! }
//! ```

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bytes::Bytes;
use romhoard_core::{
  fact::ResourceKind,
  source::{
    Candidate, MediaPayload, ScrapeSource, SearchQuery, SourceAttributes,
    SourceError, SourceProfile,
  },
};
use serde::Deserialize;

pub const IMPORT_SOURCE_NAME: &str = "import";

/// One parsed definition file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ImportDefinition {
  /// Display title; the file stem when absent.
  title:        Option<String>,
  release_year: Option<i32>,
  /// Textual kind name (snake_case) to value.
  texts:        BTreeMap<String, String>,
  /// Binary kind name to media path, relative to the import directory.
  media:        BTreeMap<String, String>,
}

struct Definition {
  /// Lowercased file stem, the search key.
  key:   String,
  title: String,
  spec:  ImportDefinition,
  path:  PathBuf,
}

pub struct ImportSource {
  root:        PathBuf,
  definitions: Vec<Definition>,
}

impl ImportSource {
  /// Scan `root` for definition files. A missing directory is an empty
  /// backend, not an error; malformed definitions are skipped with a
  /// warning.
  pub fn open(root: &Path) -> Result<Self> {
    let mut definitions = Vec::new();
    let entries = match std::fs::read_dir(root) {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::warn!(
          "import directory {} does not exist, no definitions loaded",
          root.display()
        );
        return Ok(Self { root: root.to_path_buf(), definitions });
      }
      Err(e) => {
        return Err(e).with_context(|| {
          format!("reading import directory {}", root.display())
        });
      }
    };

    for entry in entries {
      let path = entry?.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
        continue;
      };
      let spec: ImportDefinition = match std::fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|raw| serde_json::from_str(&raw).map_err(Into::into))
      {
        Ok(spec) => spec,
        Err(e) => {
          tracing::warn!("skipping definition {}: {e}", path.display());
          continue;
        }
      };
      definitions.push(Definition {
        key: stem.to_lowercase(),
        title: spec.title.clone().unwrap_or_else(|| stem.into_owned()),
        spec,
        path,
      });
    }
    definitions.sort_by(|a, b| a.key.cmp(&b.key));
    tracing::info!(
      "import backend loaded {} definitions from {}",
      definitions.len(),
      root.display()
    );
    Ok(Self { root: root.to_path_buf(), definitions })
  }

  pub fn len(&self) -> usize { self.definitions.len() }

  pub fn is_empty(&self) -> bool { self.definitions.is_empty() }

  fn lookup(&self, key: &str) -> Option<&Definition> {
    self.definitions.iter().find(|def| def.key == key)
  }
}

impl ScrapeSource for ImportSource {
  fn name(&self) -> &str { IMPORT_SOURCE_NAME }

  fn profile(&self) -> SourceProfile { SourceProfile::single() }

  async fn search(
    &self,
    query: &SearchQuery,
  ) -> Result<Vec<Candidate>, SourceError> {
    let Some(def) = self.lookup(&query.text.to_lowercase()) else {
      return Ok(Vec::new());
    };
    let mut candidate =
      Candidate::new(def.title.clone(), query.platform.clone());
    candidate.release_year = def.spec.release_year;
    candidate.source_ref = serde_json::Value::String(def.key.clone());
    Ok(vec![candidate])
  }

  async fn fetch(
    &self,
    candidate: &Candidate,
  ) -> Result<SourceAttributes, SourceError> {
    let key = candidate.source_ref.as_str().ok_or_else(|| {
      SourceError::Transient("candidate carries no import key".to_string())
    })?;
    let def = self.lookup(key).ok_or_else(|| {
      SourceError::Transient(format!("no import definition for \"{key}\""))
    })?;

    let mut attributes = SourceAttributes::default();
    attributes.texts.insert(ResourceKind::Title, def.title.clone());

    for (name, value) in &def.spec.texts {
      match ResourceKind::parse(name) {
        Ok(kind) if !kind.is_binary() => {
          attributes.texts.insert(kind, value.clone());
        }
        Ok(_) => tracing::warn!(
          "{}: \"{name}\" is a media kind, list it under \"media\"",
          def.path.display()
        ),
        Err(_) => tracing::warn!(
          "{}: unknown kind \"{name}\"",
          def.path.display()
        ),
      }
    }

    for (name, relative) in &def.spec.media {
      let kind = match ResourceKind::parse(name) {
        Ok(kind) if kind.is_binary() => kind,
        Ok(_) => {
          tracing::warn!(
            "{}: \"{name}\" is a textual kind, list it under \"texts\"",
            def.path.display()
          );
          continue;
        }
        Err(_) => {
          tracing::warn!(
            "{}: unknown kind \"{name}\"",
            def.path.display()
          );
          continue;
        }
      };
      let media_path = self.root.join(relative);
      let data = match std::fs::read(&media_path) {
        Ok(data) => Bytes::from(data),
        Err(e) => {
          tracing::warn!(
            "cannot read media {}: {e}",
            media_path.display()
          );
          continue;
        }
      };
      let extension = media_path
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
      attributes.media.push(MediaPayload { kind, data, extension });
    }

    Ok(attributes)
  }
}
