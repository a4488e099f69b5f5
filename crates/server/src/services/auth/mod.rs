//! Authentication service.
//!
//! Registration, login, and the password reset flow. Passwords are hashed
//! with argon2id; hashes never leave the service.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use savory_core::{Email, EmailError as EmailParseError, UserId};

use crate::db::{RepositoryError, users::UserRepository};
use crate::models::User;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// How long a password reset token stays valid.
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Random bytes behind a reset token, before base64 encoding.
const RESET_TOKEN_BYTES: usize = 32;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account behind the given identity.
    #[error("user not found")]
    UserNotFound,

    /// The email is already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password failed a strength rule. The message is user-facing.
    #[error("{0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The supplied email does not parse.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailParseError),

    /// The reset token is unknown or expired.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// A name field failed validation. The message is user-facing.
    #[error("{0}")]
    InvalidName(String),

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Hashing or hash parsing failed.
    #[error("password hash error: {0}")]
    PasswordHash(String),
}

/// Registration form fields.
#[derive(Debug)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
}

/// Authentication operations over the user repository.
pub struct AuthService<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthService<'a> {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn users(&self) -> UserRepository<'a> {
        UserRepository::new(self.pool)
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad form input, or
    /// [`AuthError::UserAlreadyExists`] if the email is taken.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &Registration<'_>) -> Result<User, AuthError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidName("You must supply a name!".to_owned()));
        }

        let email = Email::parse(form.email)?;
        validate_password(form.password, form.password_confirm)?;

        let hash = hash_password(form.password)?;

        match self.users().create(&email, name, &hash).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::Conflict(_)) => Err(AuthError::UserAlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and return the account.
    ///
    /// An unknown email and a wrong password both come back as
    /// [`AuthError::InvalidCredentials`] so the response does not reveal
    /// which one it was.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on any mismatch.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some(user) = self.users().get_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        let Some(hash) = self.users().password_hash(user.id).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if verify_password(&hash, password)? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Begin a password reset: mint a token valid for one hour and store it.
    ///
    /// Returns `None` when the email is not registered. Callers must respond
    /// the same way in both cases.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    #[instrument(skip(self))]
    pub async fn start_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            // Unparseable email cannot be registered; same outcome as unknown.
            return Ok(None);
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        let user = self
            .users()
            .set_reset_token(&email, &token, expires_at)
            .await?;

        Ok(user.map(|u| (u, token)))
    }

    /// Look up the account behind a live reset token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResetToken`] for unknown and expired
    /// tokens alike.
    pub async fn user_for_reset_token(&self, token: &str) -> Result<User, AuthError> {
        self.users()
            .get_by_valid_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }

    /// Complete a password reset: validate, re-hash, and burn the token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidResetToken`] if the token is unknown or
    /// expired, or a validation variant for bad passwords.
    #[instrument(skip(self, password, password_confirm, token))]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, AuthError> {
        let user = self.user_for_reset_token(token).await?;
        validate_password(password, password_confirm)?;

        let hash = hash_password(password)?;
        self.users()
            .set_password_and_clear_token(user.id, &hash)
            .await?;

        Ok(user)
    }

    /// Update the logged-in user's name and email.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserAlreadyExists`] if the new email belongs to
    /// another account.
    pub async fn update_account(
        &self,
        id: UserId,
        name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidName("You must supply a name!".to_owned()));
        }
        let email = Email::parse(email)?;

        match self.users().update_profile(id, name, &email).await {
            Ok(user) => Ok(user),
            Err(RepositoryError::Conflict(_)) => Err(AuthError::UserAlreadyExists),
            Err(RepositoryError::NotFound) => Err(AuthError::UserNotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Hash a password with argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2 hash.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if the stored hash does not parse.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn validate_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::WeakPassword("Password cannot be blank!".to_owned()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

/// Mint a URL-safe random reset token.
fn generate_reset_token() -> String {
    let bytes: [u8; RESET_TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password(&hash, "correct horse battery").unwrap());
        assert!(!verify_password(&hash, "wrong password").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("not-a-phc-string", "pw"),
            Err(AuthError::PasswordHash(_))
        ));
    }

    #[test]
    fn test_validate_password_rules() {
        assert!(matches!(
            validate_password("", ""),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("short", "short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("long enough", "different"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(validate_password("long enough", "long enough").is_ok());
    }

    #[test]
    fn test_reset_tokens_are_unique_and_url_safe() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
