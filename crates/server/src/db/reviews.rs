//! Review repository.
//!
//! Review reads always join the author row; templates never see a bare
//! author ID.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use savory_core::{Email, Rating, ReviewId, StoreId, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewAuthor, ReviewWithAuthor};

#[derive(sqlx::FromRow)]
struct ReviewWithAuthorRow {
    id: ReviewId,
    created_at: DateTime<Utc>,
    author_id: UserId,
    store_id: StoreId,
    text: String,
    rating: Option<Rating>,
    author_name: String,
    author_email: Email,
}

impl ReviewWithAuthorRow {
    fn into_review(self) -> ReviewWithAuthor {
        ReviewWithAuthor {
            review: Review {
                id: self.id,
                created_at: self.created_at,
                author_id: self.author_id,
                store_id: self.store_id,
                text: self.text,
                rating: self.rating,
            },
            author: ReviewAuthor {
                id: self.author_id,
                name: self.author_name,
                email: self.author_email,
            },
        }
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a review to a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store no longer exists
    /// (foreign key violation).
    pub async fn add(
        &self,
        author: UserId,
        store: StoreId,
        text: &str,
        rating: Option<Rating>,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, (ReviewId, DateTime<Utc>)>(
            "INSERT INTO review (author_id, store_id, text, rating)
             VALUES ($1, $2, $3, $4)
             RETURNING id, created_at",
        )
        .bind(author)
        .bind(store)
        .bind(text)
        .bind(rating)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(Review {
            id: row.0,
            created_at: row.1,
            author_id: author,
            store_id: store,
            text: text.to_owned(),
            rating,
        })
    }

    /// All reviews for a store with their authors, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_store(&self, store: StoreId) -> Result<Vec<ReviewWithAuthor>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewWithAuthorRow>(
            "SELECT r.id, r.created_at, r.author_id, r.store_id, r.text, r.rating,
                    u.name AS author_name, u.email AS author_email
             FROM review r
             JOIN app_user u ON u.id = r.author_id
             WHERE r.store_id = $1
             ORDER BY r.created_at DESC",
        )
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ReviewWithAuthorRow::into_review).collect())
    }
}
