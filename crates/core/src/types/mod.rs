//! Core types for Savory.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod coordinates;
pub mod email;
pub mod id;
pub mod rating;
pub mod slug;

// Defined via the `define_id!` macro in `id.rs`.
pub use id::{ReviewId, StoreId, UserId};
