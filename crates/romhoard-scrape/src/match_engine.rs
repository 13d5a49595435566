//! Candidate ranking and selection.
//!
//! Pure functions of candidates, compare title, and [`MatchConfig`] — no
//! I/O, no clocks. The worker hands these the search results for one file
//! and commits whatever wins.

use std::collections::HashSet;

use romhoard_core::{
  config::MatchConfig,
  source::{Candidate, Cardinality, SourceProfile},
};
use romhoard_naming::{numerals, titles};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The selected candidate and how well it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
  /// Index into the candidate slice handed to [`select_candidate`].
  pub index:    usize,
  pub distance: usize,
  /// 0-100.
  pub score:    u8,
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// Pick the best candidate for `compare_title`, or `None` when nothing
/// survives filtering.
///
/// Single-result backends (and precise backends that returned exactly one
/// candidate) are trusted outright, subject only to the release-year sanity
/// check. Everything else runs the full gauntlet: numeral and year filters,
/// the immediate-win equivalences, then minimum edit distance.
pub fn select_candidate(
  candidates: &[Candidate],
  compare_title: &str,
  file_year: Option<i32>,
  profile: SourceProfile,
  config: &MatchConfig,
) -> Option<MatchOutcome> {
  if candidates.is_empty() {
    return None;
  }

  let trusted = profile.cardinality == Cardinality::SingleResult
    || (profile.precise && candidates.len() == 1);
  if trusted {
    if year_conflict(file_year, candidates[0].release_year) {
      return None;
    }
    return Some(MatchOutcome { index: 0, distance: 0, score: 100 });
  }

  let lowered_compare = compare_title.to_lowercase();
  let numeral_exempt = config.is_numeral_exception(&lowered_compare);
  let compare_numeral = numerals::numeral_of(compare_title);

  let mut best: Option<(usize, usize, String, String)> = None;
  for (index, candidate) in candidates.iter().enumerate() {
    if year_conflict(file_year, candidate.release_year) {
      continue;
    }
    if !numeral_exempt
      && numerals::numeral_of(&candidate.title) != compare_numeral
    {
      continue;
    }

    let (distance, a, b) =
      pair_distance(compare_title, &candidate.title, config);
    if distance == 0 {
      return Some(MatchOutcome { index, distance: 0, score: 100 });
    }
    if best.as_ref().is_none_or(|(_, held, _, _)| distance < *held) {
      best = Some((index, distance, a, b));
    }
  }

  best.map(|(index, distance, a, b)| MatchOutcome {
    index,
    distance,
    score: match_score(distance, &a, &b),
  })
}

/// Score every candidate for interactive presentation, best first. No
/// filtering — the point is showing a human what the automation rejected.
pub fn rank(
  candidates: &[Candidate],
  compare_title: &str,
  config: &MatchConfig,
) -> Vec<(usize, u8)> {
  let mut scored: Vec<(usize, u8)> = candidates
    .iter()
    .enumerate()
    .map(|(index, candidate)| {
      let (distance, a, b) =
        pair_distance(compare_title, &candidate.title, config);
      (index, match_score(distance, &a, &b))
    })
    .collect();
  scored.sort_by(|x, y| y.1.cmp(&x.1).then(x.0.cmp(&y.0)));
  scored
}

fn year_conflict(file_year: Option<i32>, candidate_year: Option<i32>) -> bool {
  match (file_year, candidate_year) {
    (Some(from_file), Some(from_candidate)) => from_file != from_candidate,
    _ => false,
  }
}

// ─── Per-pair distance ───────────────────────────────────────────────────────

/// Distance between the compare title and one candidate title, after the
/// immediate-win equivalences and subtitle handling. Returns the lowercased
/// pair the distance was computed over; the score step needs the same pair
/// for its substring rescue.
fn pair_distance(
  compare_title: &str,
  candidate_title: &str,
  config: &MatchConfig,
) -> (usize, String, String) {
  let mut a = compare_title.trim().to_lowercase();
  let mut b = candidate_title.trim().to_lowercase();

  if a == b || a == titles::clean_stem(&b) {
    return (0, a, b);
  }
  if titles::the_reposition_equal(&a, &b) {
    return (0, a, b);
  }
  if word_subset_equal(&a, &b, config) {
    return (0, a, b);
  }

  // Subtitle handling only cuts in for meaningfully long, uneven pairs
  // where exactly one side carries a marker.
  let a_len = a.chars().count();
  let b_len = b.chars().count();
  if a_len.max(b_len) >= config.subtitle_min_title_len
    && a_len.abs_diff(b_len) > config.subtitle_length_gap
    && titles::has_subtitle(&a) != titles::has_subtitle(&b)
  {
    // A longer title ending in the shorter one means the "subtitle" is the
    // real title.
    let shorter_is_tail = if a_len <= b_len {
      b.ends_with(a.as_str())
    } else {
      a.ends_with(b.as_str())
    };
    if shorter_is_tail {
      return (0, a, b);
    }
    if titles::has_subtitle(&a) {
      a = titles::strip_subtitle(&a).to_string();
    } else {
      b = titles::strip_subtitle(&b).to_string();
    }
  }

  let distance = levenshtein(&a, &b);
  (distance, a, b)
}

/// Both-direction whole-word containment for significant words, applied
/// only when the checked side has at least three of them.
fn word_subset_equal(a: &str, b: &str, config: &MatchConfig) -> bool {
  significant_subset(a, b, config) || significant_subset(b, a, config)
}

fn significant_subset(of: &str, within: &str, config: &MatchConfig) -> bool {
  let significant: Vec<&str> = of
    .split_whitespace()
    .filter(|word| word.chars().count() > config.significant_word_len)
    .collect();
  if significant.len() < 3 {
    return false;
  }
  let words: HashSet<&str> = within.split_whitespace().collect();
  significant.iter().all(|word| words.contains(word))
}

// ─── Scoring ─────────────────────────────────────────────────────────────────

/// The 0-100 score for a distance over the longer of the two titles.
/// Rescue rule: a score of at least 50 whose shorter title is contained in
/// the longer is promoted to 100 (prefixed forms of the same title).
pub fn match_score(distance: usize, a: &str, b: &str) -> u8 {
  let a_len = a.chars().count();
  let b_len = b.chars().count();
  let max_len = a_len.max(b_len);
  if max_len == 0 {
    return 100;
  }
  let naive = (100 * max_len.saturating_sub(distance)) / max_len;
  if naive >= 50 {
    let (shorter, longer) = if a_len <= b_len { (a, b) } else { (b, a) };
    if longer.contains(shorter) {
      return 100;
    }
  }
  naive as u8
}

/// Plain character-level edit distance, two-row dynamic programming.
pub fn levenshtein(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut previous: Vec<usize> = (0..=b.len()).collect();
  let mut current = vec![0usize; b.len() + 1];
  for (i, ca) in a.iter().enumerate() {
    current[0] = i + 1;
    for (j, cb) in b.iter().enumerate() {
      let substitution = previous[j] + usize::from(ca != cb);
      current[j + 1] = substitution
        .min(previous[j + 1] + 1)
        .min(current[j] + 1);
    }
    std::mem::swap(&mut previous, &mut current);
  }
  previous[b.len()]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> MatchConfig { MatchConfig::default() }

  fn named(titles: &[&str]) -> Vec<Candidate> {
    titles
      .iter()
      .map(|title| Candidate::new(*title, "snes"))
      .collect()
  }

  fn pick(candidates: &[Candidate], compare: &str) -> Option<MatchOutcome> {
    select_candidate(
      candidates,
      compare,
      None,
      SourceProfile::multi(),
      &config(),
    )
  }

  #[test]
  fn exact_title_scores_one_hundred() {
    let outcome = pick(&named(&["Zelda"]), "Zelda").unwrap();
    assert_eq!(outcome.index, 0);
    assert_eq!(outcome.distance, 0);
    assert_eq!(outcome.score, 100);
  }

  #[test]
  fn bracketed_candidate_still_matches_exactly() {
    let outcome = pick(&named(&["Zelda (USA)"]), "Zelda").unwrap();
    assert_eq!(outcome.score, 100);
  }

  #[test]
  fn the_reposition_counts_as_exact() {
    let outcome = pick(&named(&["The Legend"]), "Legend, The").unwrap();
    assert_eq!(outcome.distance, 0);
    assert_eq!(outcome.score, 100);
  }

  #[test]
  fn numeral_mismatch_excludes_candidate() {
    assert!(pick(&named(&["Game III"]), "Game II").is_none());

    let outcome = pick(&named(&["Game III", "Game II"]), "Game II").unwrap();
    assert_eq!(outcome.index, 1);
    assert_eq!(outcome.score, 100);
  }

  #[test]
  fn numeral_exception_bypasses_the_filter() {
    // "Mega Man X" carries numeral 10; a numeral-1 candidate would normally
    // be dropped, but the title sits on the exception list.
    let outcome = pick(&named(&["Mega Man"]), "Mega Man X").unwrap();
    assert_eq!(outcome.index, 0);
    assert_eq!(outcome.score, 100); // substring rescue

    assert!(pick(&named(&["Game"]), "Game II").is_none());
  }

  #[test]
  fn conflicting_release_year_drops_the_candidate() {
    let mut candidate = Candidate::new("Raiden", "arcade");
    candidate.release_year = Some(1991);

    let missed = select_candidate(
      &[candidate.clone()],
      "Raiden",
      Some(1990),
      SourceProfile::multi(),
      &config(),
    );
    assert!(missed.is_none());

    candidate.release_year = Some(1990);
    let hit = select_candidate(
      &[candidate],
      "Raiden",
      Some(1990),
      SourceProfile::multi(),
      &config(),
    );
    assert_eq!(hit.unwrap().score, 100);
  }

  #[test]
  fn single_result_backends_are_trusted() {
    let outcome = select_candidate(
      &named(&["Completely Different Name"]),
      "Zelda",
      None,
      SourceProfile::single(),
      &config(),
    )
    .unwrap();
    assert_eq!(outcome.index, 0);
    assert_eq!(outcome.score, 100);
  }

  #[test]
  fn trusted_candidate_still_fails_the_year_check() {
    let mut candidate = Candidate::new("Zelda", "nes");
    candidate.release_year = Some(1993);

    let outcome = select_candidate(
      &[candidate],
      "Zelda",
      Some(1986),
      SourceProfile::single(),
      &config(),
    );
    assert!(outcome.is_none());
  }

  #[test]
  fn precise_backend_is_trusted_only_for_a_lone_candidate() {
    let profile = SourceProfile::multi().precise();

    let lone = select_candidate(
      &named(&["Whatever It Says"]),
      "Zelda",
      None,
      profile,
      &config(),
    )
    .unwrap();
    assert_eq!(lone.score, 100);

    // Two candidates force real ranking; the garbage one cannot win 100.
    let ranked = select_candidate(
      &named(&["Zeldo", "Whatever It Says"]),
      "Zelda",
      None,
      profile,
      &config(),
    )
    .unwrap();
    assert_eq!(ranked.index, 0);
    assert!(ranked.score < 100);
  }

  #[test]
  fn word_subset_in_any_order_wins() {
    let outcome = pick(
      &named(&["Generations Street Fighter Alpha"]),
      "Street Fighter Alpha Generations",
    )
    .unwrap();
    assert_eq!(outcome.distance, 0);
    assert_eq!(outcome.score, 100);
  }

  #[test]
  fn subtitle_that_is_the_real_title_wins() {
    let outcome = pick(
      &named(&["Castlevania: Symphony of the Night"]),
      "Symphony of the Night",
    )
    .unwrap();
    assert_eq!(outcome.distance, 0);
    assert_eq!(outcome.score, 100);
  }

  #[test]
  fn subtitle_is_stripped_before_distance() {
    let outcome = pick(
      &named(&["Final Fight Guy: Special Move Collection"]),
      "Final Fight Gai",
    )
    .unwrap();
    // "final fight guy" vs "final fight gai" after stripping.
    assert_eq!(outcome.distance, 2);
    assert_eq!(outcome.score, 86);
  }

  #[test]
  fn empty_candidate_list_finds_nothing() {
    assert!(pick(&[], "Zelda").is_none());
  }

  #[test]
  fn rank_orders_best_first() {
    let ranked = rank(
      &named(&["Metroid", "Zelda", "Zeldo"]),
      "Zelda",
      &config(),
    );
    assert_eq!(ranked[0], (1, 100));
    assert_eq!(ranked.len(), 3);
    assert!(ranked[1].1 >= ranked[2].1);
  }

  #[test]
  fn score_of_sixty_has_no_rescue() {
    assert_eq!(match_score(4, "aaaaaaaaaa", "aaaaaabbbb"), 60);
  }

  #[test]
  fn rescue_promotes_contained_titles() {
    // Naive score is exactly 50, but the shorter is a prefix of the longer.
    assert_eq!(match_score(5, "abcde", "abcdefghij"), 100);
  }

  #[test]
  fn levenshtein_basics() {
    assert_eq!(levenshtein("kitten", "sitting"), 3);
    assert_eq!(levenshtein("", "abc"), 3);
    assert_eq!(levenshtein("same", "same"), 0);
  }
}
