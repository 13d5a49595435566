//! Filename-stem cleanup and title structure helpers.
//!
//! Pipeline for one file:
//!   raw stem
//!     └─ alias lookup (exact stem, done by the caller)
//!          └─ clean_stem()       → compare title
//!               └─ subtitle / "The" / year helpers consulted during matching

// ─── Stem cleanup ────────────────────────────────────────────────────────────

/// Remove every `(...)` and `[...]` group. Unbalanced closers are dropped;
/// an unclosed opener swallows the rest of the string, matching how dump
/// names are actually written.
pub fn strip_brackets(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut depth = 0usize;
  for c in name.chars() {
    match c {
      '(' | '[' => depth += 1,
      ')' | ']' => depth = depth.saturating_sub(1),
      _ if depth == 0 => out.push(c),
      _ => {}
    }
  }
  out
}

/// Turn a filename stem into the compare title used for matching:
/// underscores become spaces, bracket groups are dropped, whitespace is
/// collapsed.
pub fn clean_stem(stem: &str) -> String {
  let unbracketted = strip_brackets(&stem.replace('_', " "));
  let mut out = String::with_capacity(unbracketted.len());
  let mut last_was_space = true;
  for c in unbracketted.chars() {
    if c.is_whitespace() {
      if !last_was_space {
        out.push(' ');
        last_was_space = true;
      }
    } else {
      out.push(c);
      last_was_space = false;
    }
  }
  while out.ends_with(' ') {
    out.pop();
  }
  out
}

// ─── Year extraction ─────────────────────────────────────────────────────────

/// Find a release year embedded in the raw filename's bracket groups,
/// e.g. `Elite (1984)(Firebird)`. Accepts exactly-four-digit runs between
/// 1950 and 2049; digits outside brackets are ignored.
pub fn year_in_name(name: &str) -> Option<i32> {
  let mut depth = 0usize;
  let mut run = 0usize;
  let mut value = 0i32;

  let check = |run: usize, value: i32| -> Option<i32> {
    (run == 4 && (1950..2050).contains(&value)).then_some(value)
  };

  for b in name.bytes() {
    match b {
      b'(' | b'[' => {
        depth += 1;
        run = 0;
      }
      b')' | b']' => {
        if depth > 0
          && let Some(year) = check(run, value)
        {
          return Some(year);
        }
        depth = depth.saturating_sub(1);
        run = 0;
      }
      b'0'..=b'9' if depth > 0 => {
        run += 1;
        value = match run {
          1 => (b - b'0') as i32,
          2..=4 => value * 10 + (b - b'0') as i32,
          _ => 0,
        };
      }
      _ => {
        if depth > 0
          && let Some(year) = check(run, value)
        {
          return Some(year);
        }
        run = 0;
      }
    }
  }
  None
}

// ─── Subtitles ───────────────────────────────────────────────────────────────

/// Split a title at its first subtitle marker (`: ` or ` - `), returning
/// `(main, subtitle)`. `None` when the title has no marker.
pub fn subtitle_split(title: &str) -> Option<(&str, &str)> {
  let colon = title.find(": ");
  let dash = title.find(" - ");
  let (pos, marker_len) = match (colon, dash) {
    (Some(c), Some(d)) if c < d => (c, 2),
    (Some(c), None) => (c, 2),
    (_, Some(d)) => (d, 3),
    (None, None) => return None,
  };
  Some((&title[..pos], &title[pos + marker_len..]))
}

pub fn has_subtitle(title: &str) -> bool { subtitle_split(title).is_some() }

/// The title with its subtitle (if any) removed.
pub fn strip_subtitle(title: &str) -> &str {
  subtitle_split(title).map_or(title, |(main, _)| main)
}

// ─── "The" repositioning ─────────────────────────────────────────────────────

/// `"Legend, The"` → `"The Legend"`. `None` when there is no `, The` suffix.
pub fn the_moved_to_front(title: &str) -> Option<String> {
  let main = title
    .strip_suffix(", The")
    .or_else(|| title.strip_suffix(", the"))?;
  Some(format!("The {main}"))
}

/// `"The Legend"` → `"Legend, The"`. `None` when there is no `The ` prefix.
pub fn the_moved_to_back(title: &str) -> Option<String> {
  let main = title
    .strip_prefix("The ")
    .or_else(|| title.strip_prefix("the "))?;
  Some(format!("{main}, The"))
}

/// Whether two titles are the same name with `The` repositioned, in either
/// direction. Comparison is case-insensitive.
pub fn the_reposition_equal(a: &str, b: &str) -> bool {
  let eq = |x: &str, y: &str| x.eq_ignore_ascii_case(y);
  the_moved_to_front(a).is_some_and(|moved| eq(&moved, b))
    || the_moved_to_front(b).is_some_and(|moved| eq(&moved, a))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn brackets_are_stripped_including_nested() {
    assert_eq!(strip_brackets("Elite (1984)(Firebird)"), "Elite ");
    assert_eq!(strip_brackets("Game [b1][o]"), "Game ");
    assert_eq!(strip_brackets("Odd (outer [inner]) End"), "Odd  End");
  }

  #[test]
  fn clean_stem_normalises_spacing() {
    assert_eq!(clean_stem("Super_Mario_World (USA) [!]"), "Super Mario World");
    assert_eq!(clean_stem("  Sonic   CD  "), "Sonic CD");
  }

  #[test]
  fn year_is_found_only_in_brackets() {
    assert_eq!(year_in_name("Elite (1984)(Firebird)"), Some(1984));
    assert_eq!(year_in_name("Doom [1993]"), Some(1993));
    assert_eq!(year_in_name("2048 Puzzle"), None);
    assert_eq!(year_in_name("Space (v1.2)"), None);
  }

  #[test]
  fn subtitle_split_prefers_earliest_marker() {
    assert_eq!(
      subtitle_split("Zelda: A Link to the Past"),
      Some(("Zelda", "A Link to the Past"))
    );
    assert_eq!(
      subtitle_split("Metroid - Zero Mission"),
      Some(("Metroid", "Zero Mission"))
    );
    assert_eq!(
      subtitle_split("A: B - C"),
      Some(("A", "B - C"))
    );
    assert_eq!(subtitle_split("Tetris"), None);
  }

  #[test]
  fn the_repositioning_round_trips() {
    assert_eq!(
      the_moved_to_front("Legend, The").as_deref(),
      Some("The Legend")
    );
    assert_eq!(
      the_moved_to_back("The Legend").as_deref(),
      Some("Legend, The")
    );
    assert!(the_reposition_equal("Legend, The", "The Legend"));
    assert!(the_reposition_equal("The Legend", "legend, the"));
    assert!(!the_reposition_equal("Legend", "The Legend"));
  }
}
