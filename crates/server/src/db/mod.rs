//! Persistence for shopcart.
//!
//! # Store
//!
//! Services never talk to a database directly. They hold a `&dyn Store`, a
//! transactional record store whose every method is atomic on its own:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryStore`] - in-process tables behind a lock (development, tests)
//!
//! # Database: `shop` schema
//!
//! ## Tables
//!
//! - `users` - Accounts, password hashes and session tokens
//! - `items` - Catalog
//! - `carts` - One active cart per user (`UNIQUE (user_id)`)
//! - `cart_items` - Cart lines (`UNIQUE (cart_id, item_id)`)
//! - `orders` - Converted carts with a frozen total
//! - `order_lines` - Immutable per-item lines of an order
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p shopcart-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shopcart_core::{
    CartId, CartItemId, ItemId, OrderId, OrderStatus, Quantity, UserId, Username,
};

use crate::models::{
    Cart, CartItem, CartLine, Item, ItemUpdate, NewItem, Order, OrderDetail, OrderWithUser,
    PlacedOrder, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Outcome of converting a user's cart into an order.
#[derive(Debug)]
pub enum Conversion {
    /// The user has no cart. Nothing was written.
    NoCart,
    /// The cart has no lines. Nothing was written and the cart is kept.
    EmptyCart,
    /// The order was created and the cart deleted.
    Placed(PlacedOrder),
}

/// Transactional record store.
///
/// Each method runs as a single atomic unit: callers never observe a
/// partially applied operation.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create_user(
        &self,
        username: &Username,
        password_hash: &str,
        admin: bool,
    ) -> Result<User, RepositoryError>;

    /// Get a user and their password hash by username.
    async fn get_user_with_password(
        &self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Replace a user's session token.
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    async fn set_user_token(&self, user_id: UserId, token: &str) -> Result<(), RepositoryError>;

    /// Resolve a session token to its user.
    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>, RepositoryError>;

    /// List all users ordered by ID.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Number of registered users.
    async fn count_users(&self) -> Result<i64, RepositoryError>;

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Add an item to the catalog.
    async fn create_item(&self, item: &NewItem) -> Result<Item, RepositoryError>;

    /// Get a catalog item by ID.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;

    /// List the catalog ordered by ID.
    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError>;

    /// Apply a partial update. Returns `None` if the item doesn't exist.
    async fn update_item(
        &self,
        id: ItemId,
        update: &ItemUpdate,
    ) -> Result<Option<Item>, RepositoryError>;

    /// Delete an item, along with any cart lines referencing it.
    ///
    /// Returns `false` if the item didn't exist.
    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError>;

    // =========================================================================
    // Carts
    // =========================================================================

    /// Get the user's cart, if any.
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Get the user's cart, creating an empty one if absent.
    ///
    /// Concurrent callers for the same user all receive the same cart.
    async fn find_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Merge `quantity` of `item_id` into the user's cart.
    ///
    /// Finds or creates the cart, then either creates a line priced at the
    /// item's current catalog price or adds to the existing line's quantity
    /// (capped at [`Quantity::MAX`], keeping its original price).
    ///
    /// Returns `None` if the item doesn't exist; nothing is written then.
    /// Returns `RepositoryError::Conflict` if the cart was converted
    /// concurrently.
    async fn add_cart_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Get a cart line together with the user owning its cart.
    async fn get_cart_item_owner(
        &self,
        id: CartItemId,
    ) -> Result<Option<(CartItem, UserId)>, RepositoryError>;

    /// Set a line's quantity if it belongs to `owner`'s cart.
    ///
    /// Returns `None` if no such line exists for that owner.
    async fn set_cart_item_quantity(
        &self,
        id: CartItemId,
        owner: UserId,
        quantity: Quantity,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Delete a line if it belongs to `owner`'s cart.
    ///
    /// Returns `false` if no such line exists for that owner.
    async fn remove_cart_item(&self, id: CartItemId, owner: UserId)
    -> Result<bool, RepositoryError>;

    /// List a cart's lines joined with their catalog items, ordered by line ID.
    async fn list_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Convert the user's cart into an order with `status`.
    ///
    /// Creates the order and its lines, then deletes the cart lines and the
    /// cart, all in one transaction.
    async fn convert_cart(
        &self,
        user_id: UserId,
        status: OrderStatus,
    ) -> Result<Conversion, RepositoryError>;

    /// Get an order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError>;

    /// List a user's orders, oldest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// List every order with the user who placed it, oldest first.
    async fn list_orders_with_users(&self) -> Result<Vec<OrderWithUser>, RepositoryError>;

    /// Set an order's status. Returns `None` if the order doesn't exist.
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
