//! Domain models.
//!
//! Validated domain objects, separate from the database row types that the
//! repositories map from.

pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use review::{Review, ReviewAuthor, ReviewWithAuthor};
pub use session::{CurrentUser, keys as session_keys};
pub use store::{Location, Store, StorePin, TagCount, TopStore};
pub use user::User;
