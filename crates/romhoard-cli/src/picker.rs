//! Interactive candidate selection for below-threshold matches.

use std::io::{BufRead, Write};

use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use romhoard_scrape::picker::{CandidatePicker, RankedCandidate};

/// Prompts on the terminal when no candidate clears the match threshold.
/// In non-interactive mode it declines every file, exactly like
/// [`romhoard_scrape::picker::AutoPicker`].
pub struct TerminalPicker {
  interactive: bool,
}

impl TerminalPicker {
  pub fn new(interactive: bool) -> Self { Self { interactive } }

  fn prompt(
    &self,
    compare_title: &str,
    ranked: &[RankedCandidate],
  ) -> Option<usize> {
    println!("no confident match for \"{compare_title}\":");
    for (i, entry) in ranked.iter().take(10).enumerate() {
      let year = entry
        .candidate
        .release_year
        .map(|y| format!(" ({y})"))
        .unwrap_or_default();
      println!(
        "  {}. {}{year}  [{}%]",
        i + 1,
        entry.candidate.title,
        entry.score
      );
    }
    print!("pick a number, type part of a title, or press enter to skip: ");
    std::io::stdout().flush().ok();

    let mut line = String::new();
    let stdin = std::io::stdin();
    stdin.lock().read_line(&mut line).ok()?;
    let line = line.trim();
    if line.is_empty() {
      return None;
    }

    if let Ok(n) = line.parse::<usize>() {
      if n >= 1 && n <= ranked.len() {
        return Some(n - 1);
      }
      return None;
    }

    let matcher = SkimMatcherV2::default();
    ranked
      .iter()
      .enumerate()
      .filter_map(|(i, entry)| {
        matcher.fuzzy_match(&entry.candidate.title, line).map(|s| (i, s))
      })
      .max_by_key(|(_, s)| *s)
      .map(|(i, _)| i)
  }
}

impl CandidatePicker for TerminalPicker {
  async fn pick(
    &self,
    compare_title: &str,
    ranked: &[RankedCandidate],
  ) -> Option<usize> {
    if !self.interactive || ranked.is_empty() {
      return None;
    }
    // Terminal I/O blocks; keep the worker thread usable for others.
    tokio::task::block_in_place(|| self.prompt(compare_title, ranked))
  }
}

#[cfg(test)]
mod tests {
  use romhoard_core::source::Candidate;

  use super::*;

  #[tokio::test(flavor = "multi_thread")]
  async fn non_interactive_mode_declines() {
    let picker = TerminalPicker::new(false);
    let ranked = vec![RankedCandidate {
      candidate: Candidate::new("Super Metroid", "snes"),
      score:     60,
    }];
    assert_eq!(picker.pick("super metroid", &ranked).await, None);
  }
}
