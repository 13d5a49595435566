//! Integration tests for `ResourceStore` against temp-dir-rooted stores.

use std::{
  path::Path,
  time::{Duration, SystemTime},
};

use bytes::Bytes;
use romhoard_core::{
  config::PriorityConfig,
  fact::{NewFact, ResourceKind},
};
use tempfile::TempDir;

use crate::{
  AddOutcome, Error, FlushScope, PurgeFilter, ResourceStore, StoreOptions,
};

async fn store_at(root: &Path) -> ResourceStore {
  ResourceStore::open(root, StoreOptions::default())
    .await
    .expect("open store")
}

fn title(identity: &str, source: &str, value: &str) -> NewFact {
  NewFact::text(identity, ResourceKind::Title, source, value)
}

fn cover(identity: &str, source: &str) -> NewFact {
  NewFact::media(
    identity,
    ResourceKind::Cover,
    source,
    Bytes::from_static(b"\x89PNG fake image bytes"),
    Some("png".to_string()),
  )
}

// ─── Fact slots ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_fact_per_slot() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  let first = s.add_fact(title("id-1", "screenscraper", "Zelda"), false);
  assert_eq!(first.unwrap(), AddOutcome::Added);

  let second = s.add_fact(title("id-1", "screenscraper", "Zelda II"), false);
  assert_eq!(second.unwrap(), AddOutcome::Skipped);

  assert_eq!(s.fact_count(), 1);
  let record = s.resolve_record("id-1", None);
  assert_eq!(record.value(ResourceKind::Title), Some("Zelda"));
}

#[tokio::test]
async fn refresh_replaces_the_slot() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
    .unwrap();
  let outcome = s.add_fact(title("id-1", "screenscraper", "Zelda II"), true);
  assert_eq!(outcome.unwrap(), AddOutcome::Replaced);

  assert_eq!(s.fact_count(), 1);
  let record = s.resolve_record("id-1", None);
  assert_eq!(record.value(ResourceKind::Title), Some("Zelda II"));
}

#[tokio::test]
async fn same_kind_from_different_sources_coexist() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
    .unwrap();
  s.add_fact(title("id-1", "mobygames", "The Legend of Zelda"), false)
    .unwrap();

  assert_eq!(s.fact_count(), 2);
}

#[tokio::test]
async fn text_payload_for_binary_kind_is_rejected() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  let err = s
    .add_fact(
      NewFact::text("id-1", ResourceKind::Cover, "screenscraper", "oops"),
      false,
    )
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(romhoard_core::Error::ExpectedMedia(_))
  ));
}

// ─── Media payloads ──────────────────────────────────────────────────────────

#[tokio::test]
async fn media_fact_lands_in_the_tree() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  let outcome = s.add_fact(cover("id-1", "screenscraper"), false).unwrap();
  assert_eq!(outcome, AddOutcome::Added);

  // Images are stored extensionless under kind/source/identity.
  let absolute = s.media().absolute("cover/screenscraper/id-1");
  assert!(absolute.is_file());

  let record = s.resolve_record("id-1", None);
  assert_eq!(
    record.value(ResourceKind::Cover),
    Some("cover/screenscraper/id-1")
  );
}

#[tokio::test]
async fn video_keeps_its_container_extension() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(
    NewFact::media(
      "id-1",
      ResourceKind::Video,
      "screenscraper",
      Bytes::from_static(b"mp4 bytes"),
      Some("mp4".to_string()),
    ),
    false,
  )
  .unwrap();

  assert!(s.media().absolute("video/screenscraper/id-1.mp4").is_file());
}

#[tokio::test]
async fn refreshed_video_with_new_extension_drops_the_old_file() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  let video = |ext: &str| {
    NewFact::media(
      "id-1",
      ResourceKind::Video,
      "screenscraper",
      Bytes::from_static(b"video bytes"),
      Some(ext.to_string()),
    )
  };

  s.add_fact(video("mp4"), false).unwrap();
  let outcome = s.add_fact(video("avi"), true).unwrap();
  assert_eq!(outcome, AddOutcome::Replaced);

  assert!(s.media().absolute("video/screenscraper/id-1.avi").is_file());
  assert!(!s.media().absolute("video/screenscraper/id-1.mp4").exists());
}

// ─── Resolution ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_facts_always_win_resolution() {
  let dir = TempDir::new().unwrap();
  let mut priority = PriorityConfig::default();
  priority
    .orderings
    .insert(ResourceKind::Title, vec!["mobygames".to_string()]);
  let s = ResourceStore::open(dir.path(), StoreOptions {
    priority,
    ..Default::default()
  })
  .await
  .unwrap();

  s.add_fact(title("id-1", "mobygames", "Scraped Title"), false)
    .unwrap();
  s.add_fact(title("id-1", "user", "Hand-Edited Title"), false)
    .unwrap();

  let record = s.resolve_record("id-1", None);
  assert_eq!(record.value(ResourceKind::Title), Some("Hand-Edited Title"));
  assert_eq!(record.values[&ResourceKind::Title].source, "user");
}

#[tokio::test]
async fn configured_ordering_beats_recency() {
  let dir = TempDir::new().unwrap();
  let mut priority = PriorityConfig::default();
  priority.orderings.insert(ResourceKind::Title, vec![
    "mobygames".to_string(),
    "screenscraper".to_string(),
  ]);
  let s = ResourceStore::open(dir.path(), StoreOptions {
    priority,
    ..Default::default()
  })
  .await
  .unwrap();

  // The screenscraper fact is newer but mobygames is listed first.
  s.add_fact(title("id-1", "mobygames", "Ordered Winner"), false)
    .unwrap();
  std::thread::sleep(Duration::from_millis(5));
  s.add_fact(title("id-1", "screenscraper", "Newer Loser"), false)
    .unwrap();

  let record = s.resolve_record("id-1", None);
  assert_eq!(record.value(ResourceKind::Title), Some("Ordered Winner"));
}

#[tokio::test]
async fn unordered_kinds_fall_back_to_newest() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "mobygames", "Older"), false)
    .unwrap();
  std::thread::sleep(Duration::from_millis(5));
  s.add_fact(title("id-1", "screenscraper", "Newer"), false)
    .unwrap();

  let record = s.resolve_record("id-1", None);
  assert_eq!(record.value(ResourceKind::Title), Some("Newer"));
  assert_eq!(record.values[&ResourceKind::Title].source, "screenscraper");
}

#[tokio::test]
async fn resolution_is_deterministic() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "mobygames", "A"), false).unwrap();
  s.add_fact(title("id-1", "screenscraper", "B"), false)
    .unwrap();
  s.add_fact(
    NewFact::text("id-1", ResourceKind::Developer, "mobygames", "Nintendo"),
    false,
  )
  .unwrap();

  let first = s.resolve_record("id-1", None);
  for _ in 0..10 {
    assert_eq!(s.resolve_record("id-1", None).values, first.values);
  }
}

#[tokio::test]
async fn source_filter_restricts_resolution() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "mobygames", "Moby Title"), false)
    .unwrap();
  std::thread::sleep(Duration::from_millis(5));
  s.add_fact(title("id-1", "screenscraper", "SS Title"), false)
    .unwrap();
  s.add_fact(
    NewFact::text("id-1", ResourceKind::Developer, "screenscraper", "Capcom"),
    false,
  )
  .unwrap();

  let record = s.resolve_record("id-1", Some("mobygames"));
  assert_eq!(record.value(ResourceKind::Title), Some("Moby Title"));
  assert_eq!(record.value(ResourceKind::Developer), None);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn has_entries_by_identity_and_source() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
    .unwrap();

  assert!(s.has_entries("id-1", None));
  assert!(s.has_entries("id-1", Some("screenscraper")));
  assert!(!s.has_entries("id-1", Some("mobygames")));
  assert!(!s.has_entries("id-2", None));
}

#[tokio::test]
async fn missing_reports_identities_lacking_a_kind() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
    .unwrap();
  s.add_fact(cover("id-1", "screenscraper"), false).unwrap();
  s.add_fact(title("id-2", "screenscraper", "Metroid"), false)
    .unwrap();

  let report = s.missing(&[ResourceKind::Cover, ResourceKind::Video]);
  assert_eq!(report[&ResourceKind::Cover], vec!["id-2".to_string()]);
  assert_eq!(report[&ResourceKind::Video], vec![
    "id-1".to_string(),
    "id-2".to_string(),
  ]);
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn facts_survive_a_reopen() {
  let dir = TempDir::new().unwrap();

  {
    let s = store_at(dir.path()).await;
    s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
      .unwrap();
    s.add_fact(cover("id-1", "screenscraper"), false).unwrap();
    s.write(FlushScope::All).await.unwrap();
  }

  let s = store_at(dir.path()).await;
  let report = s.read().await.unwrap();
  assert_eq!(report.facts, 2);
  assert_eq!(report.dropped, 0);

  let record = s.resolve_record("id-1", None);
  assert_eq!(record.value(ResourceKind::Title), Some("Zelda"));
  assert_eq!(
    record.value(ResourceKind::Cover),
    Some("cover/screenscraper/id-1")
  );
}

#[tokio::test]
async fn quick_id_only_flush_leaves_facts_unpersisted() {
  let dir = TempDir::new().unwrap();
  let rom = dir.path().join("game.bin");
  std::fs::write(&rom, b"rom contents").unwrap();

  {
    let s = store_at(dir.path()).await;
    s.identity_for(&rom).unwrap();
    s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
      .unwrap();
    s.write(FlushScope::QuickIdsOnly).await.unwrap();
  }

  let s = store_at(dir.path()).await;
  let report = s.read().await.unwrap();
  assert_eq!(report.facts, 0);
  assert_eq!(report.quick_ids, 1);
}

#[tokio::test]
async fn read_drops_facts_whose_media_vanished() {
  let dir = TempDir::new().unwrap();

  {
    let s = store_at(dir.path()).await;
    s.add_fact(cover("id-1", "screenscraper"), false).unwrap();
    s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
      .unwrap();
    s.write(FlushScope::All).await.unwrap();
    std::fs::remove_file(s.media().absolute("cover/screenscraper/id-1"))
      .unwrap();
  }

  let s = store_at(dir.path()).await;
  let report = s.read().await.unwrap();
  assert_eq!(report.dropped, 1);
  assert_eq!(report.facts, 1);
  assert_eq!(s.resolve_record("id-1", None).value(ResourceKind::Cover), None);
}

// ─── Quick-ids ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn quick_id_is_reused_while_the_file_is_unchanged() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;
  let rom = dir.path().join("game.bin");
  std::fs::write(&rom, b"first contents").unwrap();

  let first = s.identity_for(&rom).unwrap();

  // Different bytes but an mtime older than the recorded check, so the
  // index entry still covers the file and the stale identity is reused.
  std::fs::write(&rom, b"second contents").unwrap();
  let file = std::fs::OpenOptions::new().write(true).open(&rom).unwrap();
  file
    .set_modified(SystemTime::now() - Duration::from_secs(3600))
    .unwrap();
  assert_eq!(s.identity_for(&rom).unwrap(), first);

  // A fresh mtime invalidates the entry and the new contents re-hash.
  file
    .set_modified(SystemTime::now() + Duration::from_secs(3600))
    .unwrap();
  let second = s.identity_for(&rom).unwrap();
  assert_ne!(second, first);
}

#[tokio::test]
async fn path_of_reverses_the_quick_id_index() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;
  let rom = dir.path().join("game.bin");
  std::fs::write(&rom, b"rom contents").unwrap();

  let identity = s.identity_for(&rom).unwrap();
  assert_eq!(
    s.path_of(&identity),
    Some(rom.to_string_lossy().into_owned())
  );
  assert_eq!(s.path_of("no-such-identity"), None);
}

// ─── Purge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn purge_by_source() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
    .unwrap();
  s.add_fact(cover("id-1", "mobygames"), false).unwrap();
  s.add_fact(title("id-1", "mobygames", "The Legend of Zelda"), false)
    .unwrap();

  let report = s.purge(&PurgeFilter {
    source: Some("mobygames".to_string()),
    kind:   None,
  });
  assert_eq!(report.removed, 2);
  assert_eq!(report.failed, 0);

  assert_eq!(s.fact_count(), 1);
  assert!(s.has_entries("id-1", Some("screenscraper")));
  assert!(!s.media().absolute("cover/mobygames/id-1").exists());
}

#[tokio::test]
async fn purge_by_kind() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(cover("id-1", "screenscraper"), false).unwrap();
  s.add_fact(cover("id-2", "mobygames"), false).unwrap();
  s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
    .unwrap();

  let report = s.purge(&PurgeFilter {
    source: None,
    kind:   Some(ResourceKind::Cover),
  });
  assert_eq!(report.removed, 2);
  assert_eq!(s.fact_count(), 1);
}

#[tokio::test]
async fn purge_all_empties_the_store() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(title("id-1", "screenscraper", "Zelda"), false)
    .unwrap();
  s.add_fact(cover("id-1", "screenscraper"), false).unwrap();

  let report = s.purge_all();
  assert_eq!(report.removed, 2);
  assert_eq!(s.fact_count(), 0);
}

// ─── Vacuum ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn vacuum_removes_facts_for_absent_files() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  let kept = dir.path().join("kept.bin");
  let gone = dir.path().join("gone.bin");
  std::fs::write(&kept, b"kept contents").unwrap();
  std::fs::write(&gone, b"gone contents").unwrap();

  let kept_id = s.identity_for(&kept).unwrap();
  let gone_id = s.identity_for(&gone).unwrap();
  s.add_fact(title(&kept_id, "screenscraper", "Kept"), false)
    .unwrap();
  s.add_fact(title(&gone_id, "screenscraper", "Gone"), false)
    .unwrap();
  s.add_fact(cover(&gone_id, "screenscraper"), false).unwrap();

  std::fs::remove_file(&gone).unwrap();
  let report = s.vacuum(&[kept.clone()]);
  assert_eq!(report.facts_removed, 2);
  assert_eq!(report.quick_ids_removed, 1);
  assert_eq!(report.failed, 0);

  assert!(s.has_entries(&kept_id, None));
  assert!(!s.has_entries(&gone_id, None));
  let media_path = format!("cover/screenscraper/{gone_id}");
  assert!(!s.media().absolute(&media_path).exists());

  // A second pass over the same file list finds nothing left to collect.
  let again = s.vacuum(&[kept]);
  assert_eq!(again.facts_removed, 0);
  assert_eq!(again.quick_ids_removed, 0);
}

// ─── Validate ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn validate_deletes_orphaned_media() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  s.add_fact(cover("id-1", "screenscraper"), false).unwrap();
  s.media()
    .write("cover/screenscraper/orphan", b"leftover bytes")
    .unwrap();

  let report = s.validate().unwrap();
  assert_eq!(report.orphans_removed, 1);
  assert_eq!(report.failed, 0);

  assert!(s.media().absolute("cover/screenscraper/id-1").is_file());
  assert!(!s.media().absolute("cover/screenscraper/orphan").exists());
}

// ─── Merge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_imports_facts_and_media() {
  let theirs_dir = TempDir::new().unwrap();
  {
    let theirs = store_at(theirs_dir.path()).await;
    theirs
      .add_fact(title("id-1", "screenscraper", "Zelda"), false)
      .unwrap();
    theirs
      .add_fact(cover("id-1", "screenscraper"), false)
      .unwrap();
    theirs.write(FlushScope::All).await.unwrap();
  }

  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;
  let report = s.merge(theirs_dir.path(), false).await.unwrap();
  assert_eq!(report.imported, 2);
  assert_eq!(report.skipped, 0);
  assert_eq!(report.failed, 0);

  let record = s.resolve_record("id-1", None);
  assert_eq!(record.value(ResourceKind::Title), Some("Zelda"));
  assert!(s.media().absolute("cover/screenscraper/id-1").is_file());
}

#[tokio::test]
async fn merge_skips_taken_slots_unless_overwriting() {
  let theirs_dir = TempDir::new().unwrap();
  {
    let theirs = store_at(theirs_dir.path()).await;
    theirs
      .add_fact(title("id-1", "screenscraper", "Their Title"), false)
      .unwrap();
    theirs.write(FlushScope::All).await.unwrap();
  }

  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;
  s.add_fact(title("id-1", "screenscraper", "Our Title"), false)
    .unwrap();

  let report = s.merge(theirs_dir.path(), false).await.unwrap();
  assert_eq!(report.skipped, 1);
  assert_eq!(report.imported, 0);
  assert_eq!(
    s.resolve_record("id-1", None).value(ResourceKind::Title),
    Some("Our Title")
  );

  let report = s.merge(theirs_dir.path(), true).await.unwrap();
  assert_eq!(report.imported, 1);
  assert_eq!(
    s.resolve_record("id-1", None).value(ResourceKind::Title),
    Some("Their Title")
  );
}

#[tokio::test]
async fn merge_from_a_directory_without_a_store_errors() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  let empty = TempDir::new().unwrap();
  let err = s.merge(empty.path(), false).await.unwrap_err();
  assert!(matches!(err, Error::NoSuchStore(_)));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_adds_of_distinct_identities_all_land() {
  let dir = TempDir::new().unwrap();
  let s = store_at(dir.path()).await;

  std::thread::scope(|scope| {
    for worker in 0..8 {
      let s = &s;
      scope.spawn(move || {
        for game in 0..10 {
          let identity = format!("id-{worker}-{game}");
          s.add_fact(title(&identity, "screenscraper", "Title"), false)
            .unwrap();
        }
      });
    }
  });

  assert_eq!(s.fact_count(), 80);
}
