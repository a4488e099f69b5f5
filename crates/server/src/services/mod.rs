//! Application services: authentication, mail delivery, photo processing.

pub mod auth;
pub mod email;
pub mod photos;
