//! HTTP middleware: session management and authentication extractors.

pub mod auth;
pub mod session;
