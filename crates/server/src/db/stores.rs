//! Store repository: listing, slug assignment, tag aggregation, ranking,
//! proximity, and text search.
//!
//! Queries use the runtime sqlx API with explicit row structs mapped into
//! domain types; anything that fails to parse back into its domain type is
//! surfaced as `RepositoryError::DataCorruption`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use savory_core::{Coordinates, Slug, StoreId, UserId};

use super::RepositoryError;
use crate::models::{Location, Store, StorePin, TagCount, TopStore};

/// Stores shown per list page.
pub const STORES_PER_PAGE: i64 = 4;

/// Proximity query radius in meters (10 km).
pub const NEAR_RADIUS_M: f64 = 10_000.0;

/// Maximum results from the proximity query.
const NEAR_LIMIT: i64 = 10;

/// Maximum results from text search.
const SEARCH_LIMIT: i64 = 5;

/// Maximum entries in the top-store ranking.
const TOP_LIMIT: i64 = 10;

/// Minimum reviews before a store qualifies for the ranking.
const MIN_TOP_REVIEWS: i64 = 2;

const STORE_COLUMNS: &str =
    "id, name, slug, description, tags, created_at, lng, lat, address, photo, author_id";

/// Fields for creating or updating a store. The slug is derived, not supplied.
#[derive(Debug, Clone)]
pub struct StoreInput {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub coordinates: Coordinates,
    pub address: String,
    pub photo: Option<String>,
}

#[derive(sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    slug: Slug,
    description: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    lng: f64,
    lat: f64,
    address: String,
    photo: Option<String>,
    author_id: UserId,
}

impl StoreRow {
    fn into_store(self) -> Result<Store, RepositoryError> {
        let coordinates = Coordinates::new(self.lng, self.lat).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coordinates in database: {e}"))
        })?;

        Ok(Store {
            id: self.id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            tags: self.tags,
            created_at: self.created_at,
            location: Location {
                coordinates,
                address: self.address,
            },
            photo: self.photo,
            author_id: self.author_id,
        })
    }
}

fn rows_into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(StoreRow::into_store).collect()
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a store, deriving a collision-free slug from its name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent writer claimed the
    /// slug between derivation and insert (the unique index catches the race
    /// the lookup cannot).
    #[instrument(skip(self, input), fields(name = %input.name, author = %author_id))]
    pub async fn create(
        &self,
        author_id: UserId,
        input: &StoreInput,
    ) -> Result<Store, RepositoryError> {
        let slug = self.assign_slug(&input.name, None).await?;

        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "INSERT INTO store (name, slug, description, tags, lng, lat, address, photo, author_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&slug)
        .bind(&input.description)
        .bind(&input.tags)
        .bind(input.coordinates.lng())
        .bind(input.coordinates.lat())
        .bind(&input.address)
        .bind(&input.photo)
        .bind(author_id)
        .fetch_one(self.pool)
        .await
        .map_err(slug_conflict)?;

        row.into_store()
    }

    /// Update a store. The slug is re-derived whenever the name changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    #[instrument(skip(self, input), fields(id = %id, name = %input.name))]
    pub async fn update(&self, id: StoreId, input: &StoreInput) -> Result<Store, RepositoryError> {
        let current = self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)?;

        // Slug derivation only happens on rename, matching create-time rules.
        let slug = if current.name == input.name {
            current.slug
        } else {
            self.assign_slug(&input.name, Some(id)).await?
        };

        // A missing photo field keeps the existing photo.
        let photo = input.photo.clone().or(current.photo);

        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "UPDATE store
             SET name = $2, slug = $3, description = $4, tags = $5,
                 lng = $6, lat = $7, address = $8, photo = $9
             WHERE id = $1
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&slug)
        .bind(&input.description)
        .bind(&input.tags)
        .bind(input.coordinates.lng())
        .bind(input.coordinates.lat())
        .bind(&input.address)
        .bind(&photo)
        .fetch_one(self.pool)
        .await
        .map_err(slug_conflict)?;

        row.into_store()
    }

    /// Derive the next free slug for `name`.
    ///
    /// Fetches every persisted slug that could be the base slug or a numeric
    /// suffix variant of it, then lets [`Slug::next_unique`] pick the next
    /// free numeric suffix. `exclude` keeps a store from colliding with
    /// itself on rename.
    async fn assign_slug(
        &self,
        name: &str,
        exclude: Option<StoreId>,
    ) -> Result<Slug, RepositoryError> {
        let base = Slug::from_name(name)
            .map_err(|e| RepositoryError::Conflict(format!("unusable store name: {e}")))?;

        let existing: Vec<String> = sqlx::query_scalar(
            "SELECT slug FROM store
             WHERE (lower(slug) = lower($1) OR lower(slug) LIKE lower($1) || '-%')
               AND ($2::int4 IS NULL OR id <> $2)",
        )
        .bind(base.as_str())
        .bind(exclude.map(|id| id.as_i32()))
        .fetch_all(self.pool)
        .await?;

        Slug::next_unique(name, &existing)
            .map_err(|e| RepositoryError::Conflict(format!("unusable store name: {e}")))
    }

    /// Fetch one page of stores (newest first) and the total count.
    ///
    /// The page query and the count query run concurrently; neither depends
    /// on the other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn page(&self, page: i64) -> Result<(Vec<Store>, i64), RepositoryError> {
        let offset = (page.max(1) - 1) * STORES_PER_PAGE;

        let page_sql = format!(
            "SELECT {STORE_COLUMNS} FROM store
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        );
        let stores_fut = sqlx::query_as::<_, StoreRow>(&page_sql)
            .bind(STORES_PER_PAGE)
            .bind(offset)
            .fetch_all(self.pool);

        let count_fut =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM store").fetch_one(self.pool);

        let (rows, count) = tokio::try_join!(stores_fut, count_fut)?;

        Ok((rows_into_stores(rows)?, count))
    }

    /// Get a store by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM store WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(StoreRow::into_store).transpose()
    }

    /// Get a store by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM store WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(StoreRow::into_store).transpose()
    }

    /// Tag aggregation: each distinct tag with the count of stores carrying
    /// it, most common first. Ties break on tag name for stable output.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tags_list(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT t.tag, COUNT(*) AS count
             FROM store s, unnest(s.tags) AS t(tag)
             GROUP BY t.tag
             ORDER BY count DESC, t.tag ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect())
    }

    /// Stores carrying `tag`; with `None`, every store that has at least one
    /// tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let rows = match tag {
            Some(tag) => {
                sqlx::query_as::<_, StoreRow>(&format!(
                    "SELECT {STORE_COLUMNS} FROM store
                     WHERE $1 = ANY(tags)
                     ORDER BY created_at DESC"
                ))
                .bind(tag)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, StoreRow>(&format!(
                    "SELECT {STORE_COLUMNS} FROM store
                     WHERE cardinality(tags) > 0
                     ORDER BY created_at DESC"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        rows_into_stores(rows)
    }

    /// Top-store ranking: stores with at least two reviews, by mean rating
    /// descending, top 10. Stores with fewer reviews are excluded entirely,
    /// not given a default score.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top(&self) -> Result<Vec<TopStore>, RepositoryError> {
        let rows = sqlx::query_as::<_, (StoreId, Slug, String, Option<String>, i64, f64)>(
            "SELECT s.id, s.slug, s.name, s.photo,
                    COUNT(r.id) AS review_count,
                    COALESCE(AVG(r.rating), 0)::double precision AS average_rating
             FROM store s
             JOIN review r ON r.store_id = s.id
             GROUP BY s.id, s.slug, s.name, s.photo
             HAVING COUNT(r.id) >= $2
             ORDER BY average_rating DESC
             LIMIT $1",
        )
        .bind(TOP_LIMIT)
        .bind(MIN_TOP_REVIEWS)
        .fetch_all(self.pool)
        .await?;

        debug_assert!(rows.iter().all(|row| ranks_in_top(row.4)));

        Ok(rows
            .into_iter()
            .map(
                |(id, slug, name, photo, review_count, average_rating)| TopStore {
                    id,
                    slug,
                    name,
                    photo,
                    review_count,
                    average_rating,
                },
            )
            .collect())
    }

    /// Proximity query: up to 10 stores within 10 km of `origin`, nearest
    /// first, projecting only the map-pin fields.
    ///
    /// Distance is the Haversine great-circle formula evaluated in SQL, the
    /// same formula as [`savory_core::haversine_meters`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn near(&self, origin: Coordinates) -> Result<Vec<StorePin>, RepositoryError> {
        let rows = sqlx::query_as::<_, (Slug, String, String, f64, f64, String, Option<String>)>(
            "SELECT slug, name, description, lng, lat, address, photo
             FROM (
                 SELECT *,
                        2 * 6371000 * asin(sqrt(
                            pow(sin(radians(lat - $2) / 2), 2)
                            + cos(radians($2)) * cos(radians(lat))
                              * pow(sin(radians(lng - $1) / 2), 2)
                        )) AS distance_m
                 FROM store
             ) candidates
             WHERE distance_m <= $3
             ORDER BY distance_m ASC
             LIMIT $4",
        )
        .bind(origin.lng())
        .bind(origin.lat())
        .bind(NEAR_RADIUS_M)
        .bind(NEAR_LIMIT)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(slug, name, description, lng, lat, address, photo)| {
                let coordinates = Coordinates::new(lng, lat).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid coordinates in database: {e}"))
                })?;
                Ok(StorePin {
                    slug,
                    name,
                    description,
                    location: Location {
                        coordinates,
                        address,
                    },
                    photo,
                })
            })
            .collect()
    }

    /// Text search over name and description, relevance-ordered, top 5.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM store
             WHERE to_tsvector('english', name || ' ' || description)
                   @@ websearch_to_tsquery('english', $1)
             ORDER BY ts_rank(
                 to_tsvector('english', name || ' ' || description),
                 websearch_to_tsquery('english', $1)
             ) DESC
             LIMIT $2"
        ))
        .bind(query)
        .bind(SEARCH_LIMIT)
        .fetch_all(self.pool)
        .await?;

        rows_into_stores(rows)
    }

    /// Stores hearted by `user`, most recently hearted first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn hearted_by(&self, user: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(
            "SELECT s.id, s.name, s.slug, s.description, s.tags, s.created_at,
                    s.lng, s.lat, s.address, s.photo, s.author_id
             FROM store s
             JOIN heart h ON h.store_id = s.id
             WHERE h.user_id = $1
             ORDER BY h.created_at DESC",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        rows_into_stores(rows)
    }
}

/// Map a unique-index violation on the slug column to a `Conflict`.
fn slug_conflict(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("slug already exists".to_owned());
    }
    RepositoryError::Database(e)
}

/// The ranking threshold, mirrored from the HAVING clause in [`StoreRepository::top`].
const fn ranks_in_top(review_count: i64) -> bool {
    review_count >= MIN_TOP_REVIEWS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranking_requires_at_least_two_reviews() {
        assert!(!ranks_in_top(0));
        assert!(!ranks_in_top(1));
        assert!(ranks_in_top(2));
        assert!(ranks_in_top(40));
    }
}
