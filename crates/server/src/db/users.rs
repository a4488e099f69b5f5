//! User repository: accounts, password hashes, reset tokens, and hearts.
//!
//! Password hashes live in their own `user_password` table and only ever
//! leave this module as an opaque string handed to the auth service. Every
//! user read aggregates the heart rows so `User::hearts` is current.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use savory_core::{Email, StoreId, UserId};

use super::RepositoryError;
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: Email,
    name: String,
    hearts: Vec<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            hearts: row.hearts.into_iter().map(StoreId::new).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_SELECT: &str = "SELECT u.id, u.email, u.name,
       COALESCE(array_agg(h.store_id ORDER BY h.created_at DESC)
                FILTER (WHERE h.store_id IS NOT NULL), '{}') AS hearts,
       u.created_at, u.updated_at
FROM app_user u
LEFT JOIN heart h ON h.user_id = u.id";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_SELECT} WHERE u.id = $1 GROUP BY u.id"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Get a user by their normalized email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_SELECT} WHERE u.email = $1 GROUP BY u.id"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Create a user and their password hash in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already
    /// registered.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id, created_at, updated_at) =
            sqlx::query_as::<_, (UserId, DateTime<Utc>, DateTime<Utc>)>(
                "INSERT INTO app_user (email, name)
                 VALUES ($1, $2)
                 RETURNING id, created_at, updated_at",
            )
            .bind(email)
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict("email already registered".to_owned());
                }
                RepositoryError::Database(e)
            })?;

        sqlx::query("INSERT INTO user_password (user_id, password_hash) VALUES ($1, $2)")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(User {
            id,
            email: email.clone(),
            name: name.to_owned(),
            hearts: Vec::new(),
            created_at,
            updated_at,
        })
    }

    /// Fetch a user's password hash for verification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM user_password WHERE user_id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(hash)
    }

    /// Update a user's name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist, or
    /// `RepositoryError::Conflict` if the new email is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE app_user SET name = $2, email = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already registered".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Store a password reset token for the account behind `email`.
    ///
    /// Returns the user if the email is registered; `None` otherwise so the
    /// caller can keep the response identical either way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_reset_token(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        sqlx::query(
            "UPDATE app_user SET reset_token = $2, reset_expires = $3, updated_at = now()
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(token)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(Some(user))
    }

    /// Find the user holding `token`, provided it has not expired.
    ///
    /// Expiry is checked in the query so an expired token behaves exactly
    /// like an unknown one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_valid_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "{USER_SELECT} WHERE u.reset_token = $1 AND u.reset_expires > now() GROUP BY u.id"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Replace the password hash and invalidate the reset token, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password_and_clear_token(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE user_password SET password_hash = $2 WHERE user_id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "UPDATE app_user SET reset_token = NULL, reset_expires = NULL, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Toggle a heart: remove it if present, add it otherwise. Returns the
    /// user with the updated heart list.
    ///
    /// The primary key on `heart` makes the add side idempotent, so a
    /// concurrent double-submit cannot produce a duplicate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self), fields(user = %user, store = %store))]
    pub async fn toggle_heart(
        &self,
        user: UserId,
        store: StoreId,
    ) -> Result<User, RepositoryError> {
        let removed = sqlx::query("DELETE FROM heart WHERE user_id = $1 AND store_id = $2")
            .bind(user)
            .bind(store)
            .execute(self.pool)
            .await?;

        if toggle_adds_heart(removed.rows_affected()) {
            sqlx::query(
                "INSERT INTO heart (user_id, store_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(user)
            .bind(store)
            .execute(self.pool)
            .await?;
        }

        self.get_by_id(user).await?.ok_or(RepositoryError::NotFound)
    }
}

/// Whether a toggle that just removed `removed_rows` heart rows must add the
/// heart instead. The delete always runs first, so two toggles in a row land
/// back in the starting state.
const fn toggle_adds_heart(removed_rows: u64) -> bool {
    removed_rows == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_only_when_nothing_was_removed() {
        assert!(toggle_adds_heart(0));
        assert!(!toggle_adds_heart(1));
    }

    #[test]
    fn test_double_toggle_restores_state() {
        for start in [false, true] {
            let mut hearted = start;
            for _ in 0..2 {
                let removed = u64::from(hearted);
                hearted = toggle_adds_heart(removed);
            }
            assert_eq!(hearted, start);
        }
    }
}
