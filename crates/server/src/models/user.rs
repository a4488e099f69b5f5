//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use savory_core::{Email, StoreId, UserId};

/// A registered user (domain type).
///
/// The password hash is owned by the auth service and never appears here;
/// the reset token fields stay inside the repository.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized unique email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Stores this user has hearted. Set-like: each ID at most once.
    pub hearts: Vec<StoreId>,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Gravatar URL derived from the email. Computed, never persisted.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        avatar_url(&self.email)
    }

    /// Whether this user has hearted `store`.
    #[must_use]
    pub fn has_hearted(&self, store: StoreId) -> bool {
        self.hearts.contains(&store)
    }
}

/// Gravatar URL for an email address (SHA-256 variant).
#[must_use]
pub fn avatar_url(email: &Email) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_str().as_bytes());
    let digest = hasher.finalize();

    let mut hash = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hash, "{byte:02x}");
    }

    format!("https://gravatar.com/avatar/{hash}?s=200&d=retro")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user_with_hearts(hearts: Vec<StoreId>) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("jane@example.com").unwrap(),
            name: "Jane".to_string(),
            hearts,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_avatar_url_is_deterministic() {
        let a = user_with_hearts(vec![]);
        assert_eq!(a.avatar_url(), a.avatar_url());
        assert!(a.avatar_url().starts_with("https://gravatar.com/avatar/"));
    }

    #[test]
    fn test_avatar_url_depends_on_email_only() {
        let a = avatar_url(&Email::parse("jane@example.com").unwrap());
        // Normalization means case differences hash identically.
        let b = avatar_url(&Email::parse("Jane@Example.COM").unwrap());
        assert_eq!(a, b);

        let c = avatar_url(&Email::parse("john@example.com").unwrap());
        assert_ne!(a, c);
    }

    #[test]
    fn test_has_hearted() {
        let user = user_with_hearts(vec![StoreId::new(3), StoreId::new(9)]);
        assert!(user.has_hearted(StoreId::new(3)));
        assert!(!user.has_hearted(StoreId::new(4)));
    }
}
