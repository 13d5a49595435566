//! Roman/arabic numeral equivalence for sequel titles.
//!
//! `"Game II"` and `"Game 2"` name the same game; `"Game II"` and
//! `"Game III"` never do. Roman detection is limited to I through XX —
//! beyond that a roman-letter token is far more likely to be a word.

/// Roman forms indexed by value; index 0 unused.
const ROMAN: [&str; 21] = [
  "", "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI",
  "XII", "XIII", "XIV", "XV", "XVI", "XVII", "XVIII", "XIX", "XX",
];

fn roman_value(token: &str) -> Option<u32> {
  ROMAN
    .iter()
    .position(|&r| !r.is_empty() && r == token)
    .map(|i| i as u32)
}

fn arabic_value(token: &str) -> Option<u32> {
  if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  token.parse().ok()
}

/// A token's numeral value, if it is one. Strips a single trailing `:` or
/// `,` so `"Zelda II: The Adventure"` still yields 2.
fn token_numeral(token: &str) -> Option<u32> {
  let token = token
    .strip_suffix(':')
    .or_else(|| token.strip_suffix(','))
    .unwrap_or(token);
  roman_value(token).or_else(|| arabic_value(token))
}

/// The sequel numeral carried by a title: the last numeral token found, or
/// 1 when the title carries none.
pub fn numeral_of(title: &str) -> u32 {
  title
    .split_whitespace()
    .filter_map(token_numeral)
    .next_back()
    .unwrap_or(1)
}

/// Replace the last numeral token with its opposite form (roman → arabic,
/// arabic → roman). `None` when there is no numeral token to swap, or the
/// arabic value has no roman form in range.
pub fn swap_numeral(title: &str) -> Option<String> {
  let tokens: Vec<&str> = title.split_whitespace().collect();
  let position = tokens
    .iter()
    .rposition(|token| token_numeral(token).is_some())?;

  let token = tokens[position];
  let (bare, suffix) = match token.strip_suffix(':') {
    Some(b) => (b, ":"),
    None => match token.strip_suffix(',') {
      Some(b) => (b, ","),
      None => (token, ""),
    },
  };

  let swapped = if let Some(value) = roman_value(bare) {
    value.to_string()
  } else {
    let value = arabic_value(bare)?;
    ROMAN.get(value as usize).filter(|r| !r.is_empty())?.to_string()
  };

  let mut rebuilt: Vec<String> =
    tokens.iter().map(|t| t.to_string()).collect();
  rebuilt[position] = format!("{swapped}{suffix}");
  Some(rebuilt.join(" "))
}
