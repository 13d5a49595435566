//! Title normalization for RomHoard.
//!
//! Converts filename stems into the compare titles and search-query
//! variants the aggregation worker matches against. Pure synchronous; no
//! I/O beyond loading the alias table.
//!
//! # Quick start
//!
//! ```
//! use romhoard_naming::{AliasTable, compare_title, search_variants};
//!
//! let title = compare_title("Zelda_II (USA) [!]", &AliasTable::empty());
//! assert_eq!(title, "Zelda II");
//! assert_eq!(search_variants(&title)[0], "Zelda II");
//! ```

pub mod aliases;
pub mod error;
pub mod numerals;
pub mod pattern;
pub mod titles;

pub use aliases::AliasTable;
pub use error::{Error, Result};

/// The normalized title matched against source candidates: the alias-table
/// entry for the exact stem when one exists, otherwise the cleaned stem.
pub fn compare_title(stem: &str, aliases: &AliasTable) -> String {
  if let Some(alias) = aliases.lookup(stem) {
    return alias.to_string();
  }
  titles::clean_stem(stem)
}

/// Ordered, deduplicated search-query variants for one compare title. The
/// worker issues them in order and stops at the first that returns any
/// candidates.
///
/// Order: the title itself, its numeral-swapped form, the subtitle-stripped
/// title, and the numeral-swapped form of that.
pub fn search_variants(compare_title: &str) -> Vec<String> {
  let mut variants: Vec<String> = Vec::with_capacity(4);
  let mut push = |candidate: String| {
    if !candidate.is_empty() && !variants.contains(&candidate) {
      variants.push(candidate);
    }
  };

  push(compare_title.to_string());
  if let Some(swapped) = numerals::swap_numeral(compare_title) {
    push(swapped);
  }

  let main = titles::strip_subtitle(compare_title);
  push(main.to_string());
  if let Some(swapped) = numerals::swap_numeral(main) {
    push(swapped);
  }

  variants
}
