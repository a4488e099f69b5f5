//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use savory_core::{Coordinates, Slug, StoreId, UserId};

/// A geographic location with a human-readable address.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    /// Validated lng/lat pair.
    pub coordinates: Coordinates,
    /// Free-text street address.
    pub address: String,
}

/// A directory entry (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// URL identifier derived from the name.
    pub slug: Slug,
    /// Free-text description.
    pub description: String,
    /// Ordered list of tag strings.
    pub tags: Vec<String>,
    /// When the store was created.
    pub created_at: DateTime<Utc>,
    /// Where the store is.
    pub location: Location,
    /// Resized photo filename under the uploads dir, if any.
    pub photo: Option<String>,
    /// The one user who owns this store.
    pub author_id: UserId,
}

impl Store {
    /// Whether `user` may edit this store.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.author_id == user
    }
}

/// The fixed projection returned by the proximity API: just enough to pin
/// a store on the map.
#[derive(Debug, Clone, Serialize)]
pub struct StorePin {
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub location: Location,
    pub photo: Option<String>,
}

/// One row of the tag aggregation: a tag and how many stores carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// One row of the top-store ranking.
///
/// Only stores with at least two reviews appear here.
#[derive(Debug, Clone, Serialize)]
pub struct TopStore {
    pub id: StoreId,
    pub slug: Slug,
    pub name: String,
    pub photo: Option<String>,
    pub review_count: i64,
    pub average_rating: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_owned_by() {
        let store = Store {
            id: StoreId::new(1),
            name: "Beer Bar".to_string(),
            slug: Slug::from_name("Beer Bar").unwrap(),
            description: String::new(),
            tags: vec![],
            created_at: Utc::now(),
            location: Location {
                coordinates: Coordinates::new(-79.4, 43.7).unwrap(),
                address: "123 Main St".to_string(),
            },
            photo: None,
            author_id: UserId::new(7),
        };

        assert!(store.is_owned_by(UserId::new(7)));
        assert!(!store.is_owned_by(UserId::new(8)));
    }
}
