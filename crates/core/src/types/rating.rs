//! Bounded review rating.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingError {
    /// The value is outside [1,5].
    #[error("rating must be between {min} and {max}, got {got}")]
    OutOfRange {
        /// Lowest allowed rating.
        min: i16,
        /// Highest allowed rating.
        max: i16,
        /// The rejected value.
        got: i16,
    },
}

/// A star rating on a review, an integer in [1,5].
///
/// Construction is the only way to obtain a `Rating`, so any value that
/// reaches the database is already in range (the schema carries a matching
/// CHECK constraint as a second line).
///
/// ```
/// use savory_core::Rating;
///
/// assert_eq!(Rating::new(4).unwrap().as_i16(), 4);
/// assert!(Rating::new(0).is_err());
/// assert!(Rating::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Rating(i16);

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: i16 = 1;
    /// Highest allowed rating.
    pub const MAX: i16 = 5;

    /// Construct a rating, rejecting values outside [1,5].
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] for values outside the range.
    pub const fn new(value: i16) -> Result<Self, RatingError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(RatingError::OutOfRange {
                min: Self::MIN,
                max: Self::MAX,
                got: value,
            });
        }
        Ok(Self(value))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(v)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        for v in 1..=5 {
            assert_eq!(Rating::new(v).unwrap().as_i16(), v);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            Rating::new(0),
            Err(RatingError::OutOfRange { got: 0, .. })
        ));
        assert!(matches!(
            Rating::new(6),
            Err(RatingError::OutOfRange { got: 6, .. })
        ));
        assert!(Rating::new(-3).is_err());
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let ok: Result<Rating, _> = serde_json::from_str("3");
        assert_eq!(ok.unwrap().as_i16(), 3);

        let bad: Result<Rating, _> = serde_json::from_str("9");
        assert!(bad.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Rating::new(5).unwrap().to_string(), "5");
    }
}
