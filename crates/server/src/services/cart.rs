//! Cart aggregate service.
//!
//! A user has at most one cart, created lazily on first access. Lines are
//! keyed by `(cart, item)`: adding an item already in the cart merges into
//! the existing line instead of creating a second one.

use tracing::{info, instrument, warn};

use shopcart_core::{CartItemId, ItemId, Quantity, UserId};

use super::ServiceError;
use crate::db::Store;
use crate::models::{Cart, CartItem, CartView};

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Get the user's cart, creating an empty one if absent.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, ServiceError> {
        self.store
            .find_or_create_cart(user_id)
            .await
            .map_err(ServiceError::from_repository)
    }

    /// Add `requested` units of an item to the user's cart.
    ///
    /// A request of zero or less adds a single unit. If the item is already
    /// in the cart its quantity grows (capped at 100) and its unit price is
    /// left untouched; otherwise a new line is priced from the catalog.
    ///
    /// Returns the line as it is after the merge.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `requested` exceeds 100.
    /// Returns `ServiceError::NotFound` if the item doesn't exist.
    /// Returns `ServiceError::Conflict` if the item was deleted concurrently.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        item_id: ItemId,
        requested: i32,
    ) -> Result<CartItem, ServiceError> {
        let quantity = Quantity::for_addition(requested)
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let line = self
            .store
            .add_cart_item(user_id, item_id, quantity)
            .await
            .map_err(ServiceError::from_repository)?
            .ok_or_else(|| ServiceError::not_found("item not found"))?;

        info!(cart_item_id = %line.id, quantity = %line.quantity, "item added to cart");
        Ok(line)
    }

    /// Set a cart line's quantity exactly. The unit price is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `requested` is outside 1-100.
    /// Returns `ServiceError::NotFound` if the line doesn't exist.
    /// Returns `ServiceError::Authorization` if the line is in another
    /// user's cart.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
        requested: i32,
    ) -> Result<CartItem, ServiceError> {
        let quantity =
            Quantity::exact(requested).map_err(|e| ServiceError::validation(e.to_string()))?;

        self.check_owner(user_id, cart_item_id).await?;

        // The write is conditional on ownership too, so a line moved or
        // deleted since the check reports as missing.
        self.store
            .set_cart_item_quantity(cart_item_id, user_id, quantity)
            .await?
            .ok_or_else(|| ServiceError::not_found("cart item not found"))
    }

    /// Delete a line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the line doesn't exist.
    /// Returns `ServiceError::Authorization` if the line is in another
    /// user's cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
    ) -> Result<(), ServiceError> {
        self.check_owner(user_id, cart_item_id).await?;

        if self.store.remove_cart_item(cart_item_id, user_id).await? {
            info!(%cart_item_id, "item removed from cart");
            Ok(())
        } else {
            Err(ServiceError::not_found("cart item not found"))
        }
    }

    /// The user's cart with its lines and live total.
    ///
    /// Creates an empty cart if the user has none, so this read can write.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn view_cart(&self, user_id: UserId) -> Result<CartView, ServiceError> {
        let cart = self.get_or_create_cart(user_id).await?;
        let lines = self.store.list_cart_lines(cart.id).await?;
        Ok(CartView::new(&cart, lines))
    }

    async fn check_owner(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
    ) -> Result<(), ServiceError> {
        let (_, owner) = self
            .store
            .get_cart_item_owner(cart_item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("cart item not found"))?;

        if owner != user_id {
            warn!(%cart_item_id, %owner, "cart item belongs to another user");
            return Err(ServiceError::forbidden(
                "cart item belongs to another user's cart",
            ));
        }
        Ok(())
    }
}
