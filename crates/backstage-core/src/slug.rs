//! URL slugs for theaters.
//!
//! A slug is derived from a display name by folding diacritics, lowercasing,
//! and collapsing every run of non-alphanumeric characters into one hyphen.
//! Slugifying a slug returns it unchanged.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{Error, Result};

/// Derive a slug from `input`, e.g. `"Teatro Municipal"` → `"teatro-municipal"`.
///
/// Characters with no ASCII base letter after decomposition act as
/// separators. The result may be empty when `input` has no usable letters.
pub fn slugify(input: &str) -> String {
  let mut slug = String::with_capacity(input.len());
  let mut pending_hyphen = false;

  for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
    if c.is_ascii_alphanumeric() {
      if pending_hyphen && !slug.is_empty() {
        slug.push('-');
      }
      pending_hyphen = false;
      slug.push(c.to_ascii_lowercase());
    } else {
      pending_hyphen = true;
    }
  }

  slug
}

/// Case- and accent-insensitive comparison key: decomposed, stripped of
/// combining marks and lowercased. `"SÃO Paulo"` and `"sao paulo"` fold to
/// the same string.
pub fn fold(input: &str) -> String {
  input
    .nfkd()
    .filter(|c| !is_combining_mark(*c))
    .flat_map(char::to_lowercase)
    .collect()
}

/// Check that a caller-supplied slug is already in canonical form.
pub fn validate_slug(slug: &str) -> Result<()> {
  if slug.is_empty() {
    return Err(Error::validation("slug must not be empty"));
  }
  if slugify(slug) != slug {
    return Err(Error::validation(format!(
      "slug {slug:?} must contain only lowercase letters, digits and single \
       inner hyphens"
    )));
  }
  Ok(())
}
