//! Order conversion, queries and status changes.

use tracing::{info, instrument, warn};

use shopcart_core::{Actor, OrderId, OrderStatus, UserId};

use super::{ServiceError, require_admin};
use crate::db::{Conversion, Store};
use crate::models::{Order, OrderDetail, OrderWithUser, PlacedOrder};

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Convert the user's cart into an order.
    ///
    /// The order total is frozen at `Σ(unit price × quantity)` over the
    /// cart's lines, and the cart and its lines are deleted. Either all of
    /// this happens or none of it does. New orders start in
    /// [`OrderStatus::INITIAL`].
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user has no cart (including
    /// when a concurrent conversion already consumed it).
    /// Returns `ServiceError::Validation` if the cart is empty; the cart is
    /// kept in that case.
    #[instrument(skip(self))]
    pub async fn create_order(&self, user_id: UserId) -> Result<PlacedOrder, ServiceError> {
        match self.store.convert_cart(user_id, OrderStatus::INITIAL).await? {
            Conversion::NoCart => Err(ServiceError::not_found("cart not found")),
            Conversion::EmptyCart => Err(ServiceError::validation(
                "cannot create order with empty cart",
            )),
            Conversion::Placed(placed) => {
                info!(
                    order_id = %placed.order.id,
                    total = %placed.total,
                    lines = placed.items.len(),
                    "order placed"
                );
                Ok(placed)
            }
        }
    }

    /// All orders placed by the user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Every order with the user who placed it. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Authorization` if `actor` is not an admin.
    #[instrument(skip(self))]
    pub async fn list_all_orders(&self, actor: &Actor) -> Result<Vec<OrderWithUser>, ServiceError> {
        require_admin(actor)?;
        Ok(self.store.list_orders_with_users().await?)
    }

    /// One order with its lines. Visible to its owner and to admins.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order doesn't exist.
    /// Returns `ServiceError::Authorization` if `actor` neither owns the
    /// order nor is an admin.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
    ) -> Result<OrderDetail, ServiceError> {
        let detail = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order not found"))?;

        if !actor.owns_or_admin(detail.order.user_id) {
            warn!(%order_id, user_id = %actor.user_id, "order belongs to another user");
            return Err(ServiceError::forbidden("order belongs to another user"));
        }
        Ok(detail)
    }

    /// Move an order to any status. Admin only.
    ///
    /// There is no transition graph: every status is reachable from every
    /// other.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    /// - `ServiceError::Authorization` if `actor` is not an admin.
    /// - `ServiceError::Validation` if `status` is not a known status.
    /// - `ServiceError::NotFound` if the order doesn't exist.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        actor: &Actor,
        order_id: OrderId,
        status: &str,
    ) -> Result<Order, ServiceError> {
        require_admin(actor)?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let order = self
            .store
            .update_order_status(order_id, status)
            .await?
            .ok_or_else(|| ServiceError::not_found("order not found"))?;

        info!(%order_id, %status, "order status changed");
        Ok(order)
    }
}
