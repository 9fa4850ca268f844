//! Order domain types.
//!
//! Orders are immutable snapshots of a converted cart. Only the status can
//! change afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopcart_core::{
    CartId, ItemId, OrderId, OrderLineId, OrderStatus, Price, Quantity, UserId, pricing,
};

use super::User;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// The cart this order was converted from. The cart no longer exists.
    pub cart_id: CartId,
    pub user_id: UserId,
    /// Frozen at conversion time.
    pub total: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// One immutable line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    /// `None` once the catalog item has been deleted.
    pub item_id: Option<ItemId>,
    /// Item name at conversion time.
    pub item_name: String,
    pub unit_price: Price,
    pub quantity: Quantity,
}

impl OrderLine {
    /// Price of this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        pricing::line_total(self.unit_price, self.quantity)
    }
}

/// Result of converting a cart into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub total: Price,
}

/// An order with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

/// An order with the user who placed it, for the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithUser {
    #[serde(flatten)]
    pub order: Order,
    pub user: User,
}
