//! Business logic services for shopcart.
//!
//! Services validate input, enforce ownership and capability checks, and
//! delegate every write to the [`Store`](crate::db::Store), whose methods
//! are atomic. They trust the [`Actor`] handed to them by the identity
//! layer completely.
//!
//! # Services
//!
//! - `auth` - Registration, login and session-token resolution
//! - `cart` - Cart aggregate: add, update, remove, view
//! - `catalog` - Item listing and admin management
//! - `orders` - Cart conversion, order queries and status changes

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod orders;

pub use auth::AuthService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use error::ServiceError;
pub use orders::OrderService;

use shopcart_core::Actor;

/// Fail with [`ServiceError::Authorization`] unless `actor` is an admin.
fn require_admin(actor: &Actor) -> Result<(), ServiceError> {
    if actor.is_admin {
        Ok(())
    } else {
        tracing::warn!(user_id = %actor.user_id, "admin capability required");
        Err(ServiceError::forbidden("admin only"))
    }
}
