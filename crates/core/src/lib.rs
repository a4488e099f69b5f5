//! Savory Core - Shared types library.
//!
//! This crate provides the validated domain types used across Savory:
//!
//! - [`Email`] - normalized (lowercased, trimmed) email address
//! - [`Slug`] - URL-safe human-readable identifier with de-duplication
//! - [`Rating`] - bounded review rating in [1,5]
//! - [`Coordinates`] - validated longitude/latitude pair
//! - Newtype IDs ([`UserId`], [`StoreId`], [`ReviewId`]) via [`define_id!`]
//!
//! With the `postgres` feature enabled, all types implement the sqlx
//! `Type`/`Encode`/`Decode` traits so they can be bound and read directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::coordinates::{Coordinates, CoordinatesError, haversine_meters};
pub use types::email::{Email, EmailError};
pub use types::rating::{Rating, RatingError};
pub use types::slug::{Slug, SlugError};
pub use types::{ReviewId, StoreId, UserId};
