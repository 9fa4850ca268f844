//! Cart domain types.
//!
//! A user owns at most one cart at a time. The cart exclusively owns its
//! lines and is deleted, lines included, when it is converted into an order.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopcart_core::{CartId, CartItemId, ItemId, Price, Quantity, UserId, pricing};

use super::Item;

/// A user's active cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// One line of a cart.
///
/// At most one line exists per `(cart_id, item_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub item_id: ItemId,
    /// Price captured from the catalog when the line was created.
    pub unit_price: Price,
    pub quantity: Quantity,
}

/// A cart line joined with its catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub item: Item,
    pub unit_price: Price,
    pub quantity: Quantity,
    pub line_total: Price,
}

impl CartLine {
    /// Join a cart item with its catalog entry.
    #[must_use]
    pub fn new(cart_item: CartItem, item: Item) -> Self {
        Self {
            id: cart_item.id,
            line_total: pricing::line_total(cart_item.unit_price, cart_item.quantity),
            unit_price: cart_item.unit_price,
            quantity: cart_item.quantity,
            item,
        }
    }
}

/// A cart with its lines and live total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub cart_id: CartId,
    pub items: Vec<CartLine>,
    /// Σ(unit price × quantity), recomputed on every read.
    pub total: Price,
}

impl CartView {
    /// Build the view for `cart`, computing the total from `items`.
    #[must_use]
    pub fn new(cart: &Cart, items: Vec<CartLine>) -> Self {
        let total = pricing::total(items.iter().map(|line| (line.unit_price, line.quantity)));
        Self {
            cart_id: cart.id,
            items,
            total,
        }
    }
}
