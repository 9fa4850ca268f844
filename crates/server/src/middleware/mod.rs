//! Request extractors for authentication.

pub mod auth;

pub use auth::{CurrentUser, bearer_token};
