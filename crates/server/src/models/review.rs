//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use savory_core::{Email, Rating, ReviewId, StoreId, UserId};

use super::user::avatar_url;

/// A review of a store (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    /// Unique review ID.
    pub id: ReviewId,
    /// When the review was written.
    pub created_at: DateTime<Utc>,
    /// Who wrote it.
    pub author_id: UserId,
    /// Which store it is about.
    pub store_id: StoreId,
    /// Required review body.
    pub text: String,
    /// Optional star rating, always in [1,5] when present.
    pub rating: Option<Rating>,
}

/// The author fields every review read resolves eagerly.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewAuthor {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

impl ReviewAuthor {
    /// Gravatar URL for the author.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        avatar_url(&self.email)
    }
}

/// A review joined with its author, as returned by every repository read.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub author: ReviewAuthor,
}
