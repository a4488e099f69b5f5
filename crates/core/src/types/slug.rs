//! URL-safe slug type and de-duplication.
//!
//! Slugs are derived from store names and used as the public identifier in
//! URLs (`/store/beer-bar`). Derivation is deterministic; uniqueness against
//! already-persisted slugs is handled by [`Slug::next_unique`], which appends
//! a numeric suffix when the base slug is taken.

use core::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// Errors that can occur when deriving a [`Slug`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum SlugError {
    /// The source name contains no usable characters.
    #[error("name produces an empty slug")]
    Empty,
}

/// A URL-safe, human-readable identifier derived from a name.
///
/// Lowercase ASCII alphanumerics separated by single hyphens. Examples:
///
/// ```
/// use savory_core::Slug;
///
/// assert_eq!(Slug::from_name("Beer Bar").unwrap().as_str(), "beer-bar");
/// assert_eq!(Slug::from_name("  Café  #1!  ").unwrap().as_str(), "cafe-1");
/// assert!(Slug::from_name("???").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a human-entered name.
    ///
    /// Lowercases, strips diacritics from common Latin-1 letters, maps every
    /// other non-alphanumeric run to a single hyphen, and trims hyphens from
    /// both ends.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if nothing usable remains.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        let mut pending_hyphen = false;

        for c in name.chars().flat_map(fold_char) {
            if c.is_ascii_alphanumeric() {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_hyphen = true;
            }
        }

        if out.is_empty() {
            return Err(SlugError::Empty);
        }

        Ok(Self(out))
    }

    /// Pick a slug for `name` that does not collide with `existing`.
    ///
    /// `existing` is the set of persisted slugs that could be the base slug
    /// or a numeric suffix variant of it (the repository fetches them with
    /// `slug = base OR slug LIKE base || '-%'`). Matching here is anchored
    /// and case-insensitive: `base`, `base-1`, `base-2`, ... count;
    /// `base-extra` does not. With no match the result is `base` itself,
    /// otherwise `base-(M+1)` where M is the highest suffix in use (a bare
    /// `base` counts as 1). Skipping past the highest suffix means a slug
    /// freed by a rename is never reissued into a still-taken one.
    ///
    /// Uniqueness holds only against the slugs visible at write time; two
    /// concurrent writers can still race. Acceptable for a single-writer
    /// low-traffic app.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if `name` produces an empty slug.
    pub fn next_unique<I, S>(name: &str, existing: I) -> Result<Self, SlugError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = Self::from_name(name)?;

        let pattern = format!("^{}(?:-([0-9]+))?$", regex::escape(base.as_str()));
        #[allow(clippy::unwrap_used)] // pattern is built from an escaped literal
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .unwrap();

        let highest = existing
            .into_iter()
            .filter_map(|s| {
                re.captures(s.as_ref()).map(|caps| {
                    caps.get(1)
                        .and_then(|m| m.as_str().parse::<u64>().ok())
                        .unwrap_or(1)
                })
            })
            .max();

        match highest {
            None => Ok(base),
            Some(m) => Ok(Self(format!("{}-{}", base.0, m + 1))),
        }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fold common accented Latin-1 letters to their ASCII base.
///
/// Anything not covered passes through unchanged and is treated as a
/// separator by `from_name` if it is not ASCII alphanumeric.
fn fold_char(c: char) -> std::option::IntoIter<char> {
    let folded = match c {
        'à'..='å' | 'À'..='Å' => 'a',
        'è'..='ë' | 'È'..='Ë' => 'e',
        'ì'..='ï' | 'Ì'..='Ï' => 'i',
        'ò'..='ö' | 'Ò'..='Ö' => 'o',
        'ù'..='ü' | 'Ù'..='Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    };
    Some(folded).into_iter()
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_basic() {
        assert_eq!(Slug::from_name("Beer Bar").unwrap().as_str(), "beer-bar");
        assert_eq!(Slug::from_name("beer-bar").unwrap().as_str(), "beer-bar");
        assert_eq!(Slug::from_name("BEER   BAR").unwrap().as_str(), "beer-bar");
    }

    #[test]
    fn test_from_name_punctuation_collapses() {
        assert_eq!(
            Slug::from_name("Tim's Tiny Tacos!!").unwrap().as_str(),
            "tim-s-tiny-tacos"
        );
        assert_eq!(Slug::from_name("--edge--case--").unwrap().as_str(), "edge-case");
    }

    #[test]
    fn test_from_name_diacritics() {
        assert_eq!(Slug::from_name("Café Olé").unwrap().as_str(), "cafe-ole");
    }

    #[test]
    fn test_from_name_empty() {
        assert!(matches!(Slug::from_name(""), Err(SlugError::Empty)));
        assert!(matches!(Slug::from_name("???"), Err(SlugError::Empty)));
    }

    #[test]
    fn test_next_unique_no_collision() {
        let slug = Slug::next_unique("Beer Bar", Vec::<String>::new()).unwrap();
        assert_eq!(slug.as_str(), "beer-bar");
    }

    #[test]
    fn test_next_unique_single_collision() {
        // POST "Beer Bar" twice: the bare base counts as suffix 1.
        let slug = Slug::next_unique("Beer Bar", ["beer-bar"]).unwrap();
        assert_eq!(slug.as_str(), "beer-bar-2");
    }

    #[test]
    fn test_next_unique_sequential_collisions() {
        let existing = ["beer-bar", "beer-bar-2", "beer-bar-3"];
        let slug = Slug::next_unique("Beer Bar", existing).unwrap();
        assert_eq!(slug.as_str(), "beer-bar-4");
    }

    #[test]
    fn test_next_unique_skips_past_highest_suffix() {
        // A rename freed "beer-bar" while "beer-bar-2" stayed taken; the
        // next create must not reuse it.
        let slug = Slug::next_unique("Beer Bar", ["beer-bar-2"]).unwrap();
        assert_eq!(slug.as_str(), "beer-bar-3");

        let slug = Slug::next_unique("Beer Bar", ["beer-bar", "beer-bar-5"]).unwrap();
        assert_eq!(slug.as_str(), "beer-bar-6");
    }

    #[test]
    fn test_next_unique_ignores_non_anchored() {
        // "beer-barn" and "beer-bar-extra" share the prefix but are not
        // numeric-suffix variants; they must not count.
        let existing = ["beer-barn", "beer-bar-extra", "beer-bar-annex-2"];
        let slug = Slug::next_unique("Beer Bar", existing).unwrap();
        assert_eq!(slug.as_str(), "beer-bar");
    }

    #[test]
    fn test_next_unique_case_insensitive() {
        let slug = Slug::next_unique("Beer Bar", ["Beer-Bar", "BEER-BAR-2"]).unwrap();
        assert_eq!(slug.as_str(), "beer-bar-3");
    }

    #[test]
    fn test_next_unique_regex_metacharacters_escaped() {
        // A name whose slug could read as a regex if unescaped.
        let slug = Slug::next_unique("C++ Cafe", ["c-cafe"]).unwrap();
        assert_eq!(slug.as_str(), "c-cafe-2");
    }
}
