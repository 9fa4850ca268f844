//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopcart_core::{Actor, UserId, Username};

/// A registered user (domain type).
///
/// Never carries the password hash or session token; those stay inside the
/// store and the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Whether the user holds the admin capability.
    pub admin: bool,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The identity this user acts as.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            is_admin: self.admin,
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    /// Opaque session token to send in the `Authorization` header.
    pub token: String,
    /// The logged-in user's ID.
    pub user_id: UserId,
    /// The logged-in user's name.
    pub username: Username,
    /// Whether the user holds the admin capability.
    pub admin: bool,
}
