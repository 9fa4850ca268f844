//! The resolved identity of the caller.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Who is performing an operation.
///
/// Produced by the identity layer once per request and trusted as-is by the
/// cart and order services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The authenticated user.
    pub user_id: UserId,
    /// Whether the user holds the admin capability.
    pub is_admin: bool,
}

impl Actor {
    /// A regular (non-admin) user.
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// A user with the admin capability.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Whether this actor may act on a resource owned by `owner`.
    #[must_use]
    pub fn owns_or_admin(&self, owner: UserId) -> bool {
        self.is_admin || self.user_id == owner
    }
}
