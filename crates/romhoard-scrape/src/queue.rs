//! The shared pending-file queue.
//!
//! One queue per run, shared by every worker. "Check empty and take" is a
//! single locked operation so two workers can never race on the last item,
//! and a stop request just clears the queue so idle workers drain out on
//! their own.

use std::{
  collections::VecDeque,
  path::PathBuf,
  sync::Mutex,
};

use romhoard_naming::pattern::wildcard_match;

pub struct WorkQueue {
  pending: Mutex<VecDeque<PathBuf>>,
}

impl WorkQueue {
  pub fn new(files: Vec<PathBuf>) -> Self {
    Self { pending: Mutex::new(files.into()) }
  }

  /// Atomically take the next pending file, or `None` when drained.
  pub fn take(&self) -> Option<PathBuf> {
    self.pending.lock().unwrap().pop_front()
  }

  pub fn len(&self) -> usize { self.pending.lock().unwrap().len() }

  pub fn is_empty(&self) -> bool { self.pending.lock().unwrap().is_empty() }

  /// Drop everything still pending; in-flight files finish on their own.
  /// Returns how many entries were discarded.
  pub fn clear(&self) -> usize {
    let mut pending = self.pending.lock().unwrap();
    let dropped = pending.len();
    pending.clear();
    dropped
  }

  /// Apply include/exclude wildcard filters against each pending file's
  /// name. An empty include list keeps everything; excludes are applied
  /// after includes. Returns how many entries remain.
  pub fn filter(&self, include: &[String], exclude: &[String]) -> usize {
    let mut pending = self.pending.lock().unwrap();
    pending.retain(|path| {
      let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
      let included = include.is_empty()
        || include.iter().any(|p| wildcard_match(p, &name));
      included && !exclude.iter().any(|p| wildcard_match(p, &name))
    });
    pending.len()
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashSet, path::PathBuf};

  use super::*;

  fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
  }

  #[test]
  fn takes_in_insertion_order_until_empty() {
    let queue = WorkQueue::new(paths(&["a.sfc", "b.sfc", "c.sfc"]));
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.take(), Some(PathBuf::from("a.sfc")));
    assert_eq!(queue.take(), Some(PathBuf::from("b.sfc")));
    assert_eq!(queue.take(), Some(PathBuf::from("c.sfc")));
    assert_eq!(queue.take(), None);
    assert!(queue.is_empty());
  }

  #[test]
  fn concurrent_takes_never_duplicate_or_lose_items() {
    let names: Vec<PathBuf> =
      (0..100).map(|i| PathBuf::from(format!("game-{i}.sfc"))).collect();
    let queue = WorkQueue::new(names);

    let mut taken: Vec<PathBuf> = Vec::new();
    std::thread::scope(|scope| {
      let handles: Vec<_> = (0..4)
        .map(|_| {
          let queue = &queue;
          scope.spawn(move || {
            let mut mine = Vec::new();
            while let Some(path) = queue.take() {
              mine.push(path);
            }
            mine
          })
        })
        .collect();
      for handle in handles {
        taken.extend(handle.join().unwrap());
      }
    });

    assert_eq!(taken.len(), 100);
    let unique: HashSet<_> = taken.iter().collect();
    assert_eq!(unique.len(), 100);
  }

  #[test]
  fn include_filter_keeps_only_matching_names() {
    let queue = WorkQueue::new(paths(&["mario.sfc", "zelda.sfc", "mario.nes"]));
    let remaining = queue.filter(&["mario.*".to_string()], &[]);
    assert_eq!(remaining, 2);
    assert_eq!(queue.take(), Some(PathBuf::from("mario.sfc")));
    assert_eq!(queue.take(), Some(PathBuf::from("mario.nes")));
  }

  #[test]
  fn exclude_filter_runs_after_include() {
    let queue = WorkQueue::new(paths(&["mario.sfc", "zelda.sfc", "mario.nes"]));
    let remaining =
      queue.filter(&["*.sfc".to_string()], &["zelda*".to_string()]);
    assert_eq!(remaining, 1);
    assert_eq!(queue.take(), Some(PathBuf::from("mario.sfc")));
  }

  #[test]
  fn clear_reports_dropped_count() {
    let queue = WorkQueue::new(paths(&["a.sfc", "b.sfc"]));
    assert_eq!(queue.clear(), 2);
    assert_eq!(queue.take(), None);
  }
}
