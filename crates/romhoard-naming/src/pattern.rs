//! Shell-style wildcard matching for queue filters.
//!
//! `*` matches any run of characters (including none), `?` exactly one.
//! Matching is case-insensitive; everything else is literal.

pub fn wildcard_match(pattern: &str, text: &str) -> bool {
  let pattern: Vec<char> =
    pattern.chars().flat_map(char::to_lowercase).collect();
  let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();

  let (mut p, mut t) = (0usize, 0usize);
  let mut star: Option<(usize, usize)> = None;

  while t < text.len() {
    if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
      p += 1;
      t += 1;
    } else if p < pattern.len() && pattern[p] == '*' {
      star = Some((p, t));
      p += 1;
    } else if let Some((star_p, star_t)) = star {
      // Backtrack: let the last `*` swallow one more character.
      p = star_p + 1;
      t = star_t + 1;
      star = Some((star_p, star_t + 1));
    } else {
      return false;
    }
  }

  while p < pattern.len() && pattern[p] == '*' {
    p += 1;
  }
  p == pattern.len()
}
