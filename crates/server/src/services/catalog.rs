//! Catalog service.
//!
//! Reads are public. Creating, updating and deleting items require the
//! admin capability. Price changes never reach existing cart or order lines.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use shopcart_core::{Actor, ItemId, ItemName, Price};

use super::{ServiceError, require_admin};
use crate::db::Store;
use crate::models::{Item, ItemUpdate, NewItem};

/// Prices are stored with two decimal places.
const PRICE_SCALE: u32 = 2;

/// Prices are stored as `NUMERIC(12, 2)`: ten integer digits.
const PRICE_INTEGER_DIGITS: u32 = 10;

fn parse_name(name: &str) -> Result<ItemName, ServiceError> {
    ItemName::parse(name).map_err(|e| ServiceError::validation(e.to_string()))
}

fn parse_price(amount: Decimal) -> Result<Price, ServiceError> {
    if amount.normalize().scale() > PRICE_SCALE {
        return Err(ServiceError::validation(format!(
            "price cannot have more than {PRICE_SCALE} decimal places"
        )));
    }
    let ceiling = Decimal::from(10_i64.pow(PRICE_INTEGER_DIGITS));
    if amount >= ceiling {
        return Err(ServiceError::validation(format!(
            "price must be less than {ceiling}"
        )));
    }
    Price::new(amount).map_err(|e| ServiceError::validation(e.to_string()))
}

/// Catalog service.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// List every item.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list_items(&self) -> Result<Vec<Item>, ServiceError> {
        Ok(self.store.list_items().await?)
    }

    /// Get one item.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the item doesn't exist.
    pub async fn get_item(&self, id: ItemId) -> Result<Item, ServiceError> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("item not found"))
    }

    /// Add an item to the catalog. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Authorization` if `actor` is not an admin.
    /// Returns `ServiceError::Validation` if the name or price is invalid.
    #[instrument(skip(self))]
    pub async fn create_item(
        &self,
        actor: &Actor,
        name: &str,
        price: Decimal,
    ) -> Result<Item, ServiceError> {
        require_admin(actor)?;
        let item = NewItem {
            name: parse_name(name)?,
            price: parse_price(price)?,
        };

        let item = self.store.create_item(&item).await?;
        info!(item_id = %item.id, name = %item.name, price = %item.price, "item created");
        Ok(item)
    }

    /// Update an item's name and/or price. Admin only.
    ///
    /// `None` leaves a field unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Authorization` if `actor` is not an admin.
    /// Returns `ServiceError::Validation` if a provided field is invalid.
    /// Returns `ServiceError::NotFound` if the item doesn't exist.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        actor: &Actor,
        id: ItemId,
        name: Option<&str>,
        price: Option<Decimal>,
    ) -> Result<Item, ServiceError> {
        require_admin(actor)?;
        let update = ItemUpdate {
            name: name.map(parse_name).transpose()?,
            price: price.map(parse_price).transpose()?,
        };

        let item = self
            .store
            .update_item(id, &update)
            .await?
            .ok_or_else(|| ServiceError::not_found("item not found"))?;
        info!(item_id = %item.id, "item updated");
        Ok(item)
    }

    /// Remove an item from the catalog. Admin only.
    ///
    /// Cart lines holding the item are removed with it. Order lines keep
    /// their name and price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Authorization` if `actor` is not an admin.
    /// Returns `ServiceError::NotFound` if the item doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, actor: &Actor, id: ItemId) -> Result<(), ServiceError> {
        require_admin(actor)?;
        if !self.store.delete_item(id).await? {
            return Err(ServiceError::not_found("item not found"));
        }
        info!(item_id = %id, "item deleted");
        Ok(())
    }
}
