//! [`ResourceStore`] — the durable, source-attributed fact cache.
//!
//! The working copy is an in-memory fact arena and quick-id index, each
//! behind its own `RwLock` (never held across an await point). SQLite is
//! the persisted artifact: `read()` loads it, `write()` flushes it back
//! transactionally. Everything between is pure in-memory mutation plus
//! media-tree side effects.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap, HashSet},
  path::{Path, PathBuf},
  sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use romhoard_core::{
  config::{IdentityPolicy, PriorityConfig},
  fact::{
    FactBody, NewFact, QuickIdEntry, ResourceFact, ResourceKind, USER_SOURCE,
  },
  record::{Attributed, GameRecord},
};

use crate::{
  encode::{RawFact, RawQuickId, encode_dt},
  identity::compute_identity,
  media::{MediaProcessor, MediaTree, Passthrough},
  schema::SCHEMA,
  Error, Result,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Construction-time configuration for a store.
pub struct StoreOptions {
  pub priority:  PriorityConfig,
  pub identity:  IdentityPolicy,
  pub processor: Arc<dyn MediaProcessor>,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      priority:  PriorityConfig::default(),
      identity:  IdentityPolicy::default(),
      processor: Arc::new(Passthrough),
    }
  }
}

/// What [`ResourceStore::write`] flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushScope {
  /// Quick-ids and the full fact list.
  All,
  /// Quick-ids only; used when a run changed no facts.
  QuickIdsOnly,
}

// ─── Outcomes and reports ────────────────────────────────────────────────────

/// What happened to one [`NewFact`] handed to [`ResourceStore::add_fact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
  Added,
  /// An existing fact in the same slot was overwritten (refresh).
  Replaced,
  /// The slot was already taken and refresh was not requested.
  Skipped,
  /// Media processing or the media write failed; the fact was not
  /// committed. Soft outcome, never an error.
  MediaFailed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
  pub facts:     usize,
  pub quick_ids: usize,
  /// Binary facts dropped because their media file no longer exists.
  pub dropped:   usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
  pub removed: usize,
  /// Facts kept because their media file could not be deleted.
  pub failed:  usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VacuumReport {
  pub facts_removed:     usize,
  pub quick_ids_removed: usize,
  pub failed:            usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateReport {
  pub orphans_removed: usize,
  pub failed:          usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
  pub imported: usize,
  pub skipped:  usize,
  pub failed:   usize,
}

/// Selects facts for [`ResourceStore::purge`]. Unset fields match
/// everything, so an empty filter selects the whole store.
#[derive(Debug, Clone, Default)]
pub struct PurgeFilter {
  pub source: Option<String>,
  pub kind:   Option<ResourceKind>,
}

impl PurgeFilter {
  fn matches(&self, fact: &ResourceFact) -> bool {
    self.source.as_deref().is_none_or(|s| fact.source == s)
      && self.kind.is_none_or(|k| fact.kind == k)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A RomHoard resource store rooted at one cache directory.
///
/// Workers share it behind an `Arc`; the in-memory state is internally
/// synchronized.
pub struct ResourceStore {
  conn:            tokio_rusqlite::Connection,
  media:           MediaTree,
  facts:           RwLock<Vec<ResourceFact>>,
  quick_ids:       RwLock<HashMap<String, QuickIdEntry>>,
  priority:        PriorityConfig,
  identity_policy: IdentityPolicy,
  processor:       Arc<dyn MediaProcessor>,
}

impl ResourceStore {
  /// Open (or create) a store rooted at `root`: `cache.db` plus a `media/`
  /// subtree. The in-memory state starts empty; call [`read`](Self::read)
  /// to load what is persisted.
  pub async fn open(
    root: impl AsRef<Path>,
    options: StoreOptions,
  ) -> Result<Self> {
    let root = root.as_ref();
    std::fs::create_dir_all(root)?;
    let media = MediaTree::new(root.join("media"));
    std::fs::create_dir_all(media.root())?;

    let conn = tokio_rusqlite::Connection::open(root.join("cache.db")).await?;
    let store = Self {
      conn,
      media,
      facts: RwLock::new(Vec::new()),
      quick_ids: RwLock::new(HashMap::new()),
      priority: options.priority,
      identity_policy: options.identity,
      processor: options.processor,
    };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub fn media(&self) -> &MediaTree { &self.media }

  // ── Persistence ───────────────────────────────────────────────────────────

  /// Load quick-ids and facts from SQLite into the in-memory state,
  /// replacing whatever was there. Binary facts whose media file is gone
  /// are dropped (the store self-heals after external deletion). A fresh
  /// store loads zero rows without error.
  pub async fn read(&self) -> Result<LoadReport> {
    let (raw_facts, raw_quick) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT identity, kind, source, value, recorded_at FROM facts",
        )?;
        let facts = stmt
          .query_map([], |row| {
            Ok(RawFact {
              identity:    row.get(0)?,
              kind:        row.get(1)?,
              source:      row.get(2)?,
              value:       row.get(3)?,
              recorded_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn
          .prepare("SELECT file_path, checked_at, identity FROM quick_ids")?;
        let quick = stmt
          .query_map([], |row| {
            Ok(RawQuickId {
              file_path:  row.get(0)?,
              checked_at: row.get(1)?,
              identity:   row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((facts, quick))
      })
      .await?;

    let mut dropped = 0usize;
    let mut facts = Vec::with_capacity(raw_facts.len());
    for raw in raw_facts {
      let fact = raw.into_fact()?;
      if fact.kind.is_binary() && !self.media.exists(&fact.value) {
        tracing::warn!(
          "dropping fact {}:{} — media file {} is missing",
          fact.identity,
          fact.kind.as_str(),
          fact.value
        );
        dropped += 1;
        continue;
      }
      facts.push(fact);
    }

    let mut quick_ids = HashMap::with_capacity(raw_quick.len());
    for raw in raw_quick {
      let entry = raw.into_entry()?;
      quick_ids.insert(entry.file_path.clone(), entry);
    }

    let report = LoadReport {
      facts:     facts.len(),
      quick_ids: quick_ids.len(),
      dropped,
    };
    *self.facts.write().unwrap() = facts;
    *self.quick_ids.write().unwrap() = quick_ids;
    Ok(report)
  }

  /// Flush the in-memory state to SQLite. The affected tables are replaced
  /// wholesale inside a single transaction, so readers of the file never
  /// see a half-written store.
  pub async fn write(&self, scope: FlushScope) -> Result<()> {
    let quick_rows: Vec<(String, String, String)> = self
      .quick_ids
      .read()
      .unwrap()
      .values()
      .map(|e| {
        (e.file_path.clone(), encode_dt(e.checked_at), e.identity.clone())
      })
      .collect();

    let fact_rows: Option<Vec<(String, String, String, String, String)>> =
      match scope {
        FlushScope::QuickIdsOnly => None,
        FlushScope::All => Some(
          self
            .facts
            .read()
            .unwrap()
            .iter()
            .map(|f| {
              (
                f.identity.clone(),
                f.kind.as_str().to_string(),
                f.source.clone(),
                f.value.clone(),
                encode_dt(f.recorded_at),
              )
            })
            .collect(),
        ),
      };

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM quick_ids", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO quick_ids (file_path, checked_at, identity)
             VALUES (?1, ?2, ?3)",
          )?;
          for (path, at, id) in &quick_rows {
            stmt.execute(rusqlite::params![path, at, id])?;
          }
        }

        if let Some(rows) = &fact_rows {
          tx.execute("DELETE FROM facts", [])?;
          let mut stmt = tx.prepare(
            "INSERT INTO facts (identity, kind, source, value, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for (identity, kind, source, value, at) in rows {
            stmt.execute(rusqlite::params![identity, kind, source, value, at])?;
          }
        }

        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Identity and quick-ids ────────────────────────────────────────────────

  /// The cache identity for `path`: the quick-id entry when it is still
  /// valid (stored check time at or after the file's mtime), otherwise a
  /// fresh computation, recorded back into the index.
  pub fn identity_for(&self, path: &Path) -> Result<String> {
    let key = path.to_string_lossy().into_owned();
    let modified: DateTime<Utc> = std::fs::metadata(path)?.modified()?.into();

    if let Some(entry) = self.quick_ids.read().unwrap().get(&key)
      && entry.checked_at >= modified
    {
      return Ok(entry.identity.clone());
    }

    let identity = compute_identity(path, &self.identity_policy)?;
    self.quick_ids.write().unwrap().insert(key.clone(), QuickIdEntry {
      file_path:  key,
      checked_at: Utc::now(),
      identity:   identity.clone(),
    });
    Ok(identity)
  }

  /// Reverse quick-id lookup: some file path last seen with `identity`.
  pub fn path_of(&self, identity: &str) -> Option<String> {
    self
      .quick_ids
      .read()
      .unwrap()
      .values()
      .find(|e| e.identity == identity)
      .map(|e| e.file_path.clone())
  }

  // ── Fact writes ───────────────────────────────────────────────────────────

  /// Record one fact. At most one fact exists per `(identity, kind,
  /// source)` slot: a taken slot is overwritten only under `refresh`,
  /// otherwise the call is a no-op. For binary kinds the media bytes are
  /// processed and written to the tree first; the fact is only committed
  /// if that side effect succeeds.
  pub fn add_fact(&self, input: NewFact, refresh: bool) -> Result<AddOutcome> {
    input.check_shape()?;

    if !refresh
      && self.slot_taken(&input.identity, input.kind, &input.source)
    {
      return Ok(AddOutcome::Skipped);
    }

    let value = match input.body {
      FactBody::Text(text) => text,
      FactBody::Media { data, extension } => {
        let relative = MediaTree::relative_path(
          input.kind,
          &input.source,
          &input.identity,
          extension.as_deref(),
        );
        let processed = match self.processor.process(input.kind, data) {
          Ok(bytes) => bytes,
          Err(e) => {
            tracing::warn!(
              "media processing failed for {}:{}: {e}",
              input.identity,
              input.kind.as_str()
            );
            return Ok(AddOutcome::MediaFailed);
          }
        };
        if let Err(e) = self.media.write(&relative, &processed) {
          tracing::warn!(
            "media write failed for {}:{}: {e}",
            input.identity,
            input.kind.as_str()
          );
          return Ok(AddOutcome::MediaFailed);
        }
        relative
      }
    };

    let fact = ResourceFact {
      identity:    input.identity,
      kind:        input.kind,
      source:      input.source,
      value,
      recorded_at: Utc::now(),
    };

    // Re-check under the write lock; another worker may have raced us.
    let mut facts = self.facts.write().unwrap();
    if let Some(existing) = facts.iter_mut().find(|f| f.same_slot(&fact)) {
      if !refresh {
        return Ok(AddOutcome::Skipped);
      }
      // A refreshed video can change container extension; drop the old
      // file when the path moved.
      if existing.kind.is_binary() && existing.value != fact.value {
        let _ = self.media.remove(&existing.value);
      }
      *existing = fact;
      return Ok(AddOutcome::Replaced);
    }
    facts.push(fact);
    Ok(AddOutcome::Added)
  }

  fn slot_taken(
    &self,
    identity: &str,
    kind: ResourceKind,
    source: &str,
  ) -> bool {
    self
      .facts
      .read()
      .unwrap()
      .iter()
      .any(|f| f.identity == identity && f.kind == kind && f.source == source)
  }

  // ── Resolution reads ──────────────────────────────────────────────────────

  /// Whether any facts exist for `identity`, optionally restricted to one
  /// source. The cache-hit check.
  pub fn has_entries(&self, identity: &str, source: Option<&str>) -> bool {
    self
      .facts
      .read()
      .unwrap()
      .iter()
      .any(|f| f.identity == identity && source.is_none_or(|s| f.source == s))
  }

  pub fn fact_count(&self) -> usize { self.facts.read().unwrap().len() }

  /// Assemble the aggregated record for `identity`: one winner per kind.
  ///
  /// Winner-take-all: a `"user"` fact always wins; otherwise the first
  /// fact along the kind's configured source ordering; otherwise the
  /// newest fact. With `source_filter`, only that source's facts compete.
  pub fn resolve_record(
    &self,
    identity: &str,
    source_filter: Option<&str>,
  ) -> GameRecord {
    let facts = self.facts.read().unwrap();
    let mut record = GameRecord::new(identity);

    for kind in ResourceKind::all() {
      let competing: Vec<&ResourceFact> = facts
        .iter()
        .filter(|f| f.identity == identity && f.kind == kind)
        .filter(|f| source_filter.is_none_or(|s| f.source == s))
        .collect();

      if let Some(winner) = self.resolve_one(&competing, kind) {
        record.values.insert(kind, Attributed {
          value:  winner.value.clone(),
          source: winner.source.clone(),
        });
      }
    }
    record
  }

  fn resolve_one<'a>(
    &self,
    competing: &[&'a ResourceFact],
    kind: ResourceKind,
  ) -> Option<&'a ResourceFact> {
    if let Some(user) = competing.iter().find(|f| f.source == USER_SOURCE) {
      return Some(*user);
    }

    if let Some(ordering) = self.priority.effective(kind) {
      for source in ordering {
        if let Some(hit) = competing.iter().find(|f| f.source == source) {
          return Some(*hit);
        }
      }
    }

    // Most-recently-added wins; a later entry wins a timestamp tie.
    competing
      .iter()
      .copied()
      .reduce(|best, f| if f.recorded_at >= best.recorded_at { f } else { best })
  }

  /// Identities lacking each of the requested kinds, from any source.
  pub fn missing(
    &self,
    kinds: &[ResourceKind],
  ) -> BTreeMap<ResourceKind, Vec<String>> {
    let facts = self.facts.read().unwrap();
    let identities: BTreeSet<&str> =
      facts.iter().map(|f| f.identity.as_str()).collect();

    let mut report = BTreeMap::new();
    for &kind in kinds {
      let have: HashSet<&str> = facts
        .iter()
        .filter(|f| f.kind == kind)
        .map(|f| f.identity.as_str())
        .collect();
      let lacking: Vec<String> = identities
        .iter()
        .filter(|id| !have.contains(*id))
        .map(|id| id.to_string())
        .collect();
      report.insert(kind, lacking);
    }
    report
  }

  // ── Reconciliation ────────────────────────────────────────────────────────

  /// Remove facts matching `filter`. Backing media is deleted first; a
  /// fact whose file cannot be deleted is kept and counted as failed.
  pub fn purge(&self, filter: &PurgeFilter) -> PurgeReport {
    let mut report = PurgeReport::default();
    let mut facts = self.facts.write().unwrap();
    facts.retain(|fact| {
      if !filter.matches(fact) {
        return true;
      }
      if fact.kind.is_binary()
        && let Err(e) = self.media.remove(&fact.value)
      {
        tracing::warn!("failed to delete media {}: {e}", fact.value);
        report.failed += 1;
        return true;
      }
      report.removed += 1;
      false
    });
    report
  }

  pub fn purge_all(&self) -> PurgeReport { self.purge(&PurgeFilter::default()) }

  /// Garbage-collect facts for files no longer present: recompute the
  /// identity of every file in `current_files` (quick-id assisted), then
  /// drop every fact and quick-id entry whose identity is not in that set.
  pub fn vacuum(&self, current_files: &[PathBuf]) -> VacuumReport {
    let mut report = VacuumReport::default();
    let mut live: HashSet<String> = HashSet::new();

    for path in current_files {
      match self.identity_for(path) {
        Ok(id) => {
          live.insert(id);
        }
        Err(e) => {
          tracing::warn!(
            "cannot compute identity for {} during vacuum: {e}",
            path.display()
          );
          report.failed += 1;
          // Unreadable but present: keep whatever identity we last knew
          // rather than vacuuming its facts away.
          let key = path.to_string_lossy();
          if let Some(entry) = self.quick_ids.read().unwrap().get(key.as_ref())
          {
            live.insert(entry.identity.clone());
          }
        }
      }
    }

    {
      let mut facts = self.facts.write().unwrap();
      facts.retain(|fact| {
        if live.contains(&fact.identity) {
          return true;
        }
        if fact.kind.is_binary()
          && let Err(e) = self.media.remove(&fact.value)
        {
          tracing::warn!("failed to delete media {}: {e}", fact.value);
          report.failed += 1;
          return true;
        }
        report.facts_removed += 1;
        false
      });
    }

    {
      let mut quick_ids = self.quick_ids.write().unwrap();
      let before = quick_ids.len();
      quick_ids.retain(|_, entry| live.contains(&entry.identity));
      report.quick_ids_removed = before - quick_ids.len();
    }

    report
  }

  /// Inverse of [`read`](Self::read)'s self-healing: sweep the media tree
  /// and delete files no fact references.
  pub fn validate(&self) -> Result<ValidateReport> {
    let referenced: HashSet<String> = self
      .facts
      .read()
      .unwrap()
      .iter()
      .filter(|f| f.kind.is_binary())
      .map(|f| f.value.clone())
      .collect();

    let mut report = ValidateReport::default();
    for relative in self.media.walk()? {
      if referenced.contains(&relative) {
        continue;
      }
      match self.media.remove(&relative) {
        Ok(()) => report.orphans_removed += 1,
        Err(e) => {
          tracing::warn!("failed to delete orphan {relative}: {e}");
          report.failed += 1;
        }
      }
    }
    Ok(report)
  }

  /// Import another store's facts. Taken slots are skipped unless
  /// `overwrite`; binary facts have their media copied across trees, and
  /// a copy failure skips that one fact without aborting the merge.
  pub async fn merge(
    &self,
    other_root: &Path,
    overwrite: bool,
  ) -> Result<MergeReport> {
    let db_path = other_root.join("cache.db");
    if !db_path.is_file() {
      return Err(Error::NoSuchStore(other_root.to_path_buf()));
    }

    let other_conn = tokio_rusqlite::Connection::open(&db_path).await?;
    let raw_facts: Vec<RawFact> = other_conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT identity, kind, source, value, recorded_at FROM facts",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawFact {
              identity:    row.get(0)?,
              kind:        row.get(1)?,
              source:      row.get(2)?,
              value:       row.get(3)?,
              recorded_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let other_media = MediaTree::new(other_root.join("media"));
    let mut report = MergeReport::default();

    for raw in raw_facts {
      let fact = match raw.into_fact() {
        Ok(fact) => fact,
        Err(e) => {
          tracing::warn!("skipping unreadable foreign fact: {e}");
          report.failed += 1;
          continue;
        }
      };

      let mut facts = self.facts.write().unwrap();
      let existing = facts.iter().position(|f| f.same_slot(&fact));
      if existing.is_some() && !overwrite {
        report.skipped += 1;
        continue;
      }

      if fact.kind.is_binary()
        && let Err(e) = self.media.copy_from(&other_media, &fact.value)
      {
        tracing::warn!("media copy failed for {}: {e}", fact.value);
        report.failed += 1;
        continue;
      }

      match existing {
        Some(index) => {
          if facts[index].kind.is_binary() && facts[index].value != fact.value
          {
            let _ = self.media.remove(&facts[index].value);
          }
          facts[index] = fact;
        }
        None => facts.push(fact),
      }
      report.imported += 1;
    }

    Ok(report)
  }
}
