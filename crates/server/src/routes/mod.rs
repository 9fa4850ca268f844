//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Health
//! GET    /health               - Liveness
//! GET    /health/ready         - Readiness (store ping)
//!
//! # Users
//! POST   /users                - Register
//! POST   /users/login          - Login, returns a session token
//! GET    /users                - List users (admin)
//!
//! # Items
//! GET    /items                - List items
//! GET    /items/{id}           - Get item
//! POST   /items                - Create item (admin)
//! PUT    /items/{id}           - Update item (admin)
//! DELETE /items/{id}           - Delete item (admin)
//!
//! # Cart (authenticated)
//! GET    /carts                - View own cart
//! POST   /carts                - Add item to own cart
//! PUT    /carts/{id}           - Set quantity of a cart item
//! DELETE /carts/{id}           - Remove a cart item
//!
//! # Orders (authenticated)
//! POST   /orders               - Convert own cart into an order
//! GET    /orders/user          - List own orders
//! GET    /orders/admin         - List all orders (admin)
//! GET    /orders/{id}          - Order detail (owner or admin)
//! PUT    /orders/{id}          - Update order status (admin)
//! ```

pub mod carts;
pub mod health;
pub mod items;
pub mod orders;
pub mod users;

use axum::Router;
use axum::extract::{FromRequest, FromRequestParts};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(users::router())
        .merge(items::router())
        .merge(carts::router())
        .merge(orders::router())
}

/// JSON body extractor whose rejection is a JSON [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejection is a JSON [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Response carrying only a confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
