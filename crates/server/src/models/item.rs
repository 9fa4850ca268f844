//! Catalog item domain types.

use serde::Serialize;

use shopcart_core::{ItemId, ItemName, Price};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub name: ItemName,
    /// Current catalog price. Cart lines snapshot this when first created.
    pub price: Price,
}

/// Input for creating a catalog item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: ItemName,
    pub price: Price,
}

/// Partial update of a catalog item. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<ItemName>,
    pub price: Option<Price>,
}

impl ItemUpdate {
    /// Apply this update to an item in place.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
    }
}
