//! Cart routes. Every route acts on the caller's own cart.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use shopcart_core::{CartItemId, ItemId};

use super::{ApiJson, ApiPath, MessageResponse};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{CartItem, CartView};
use crate::services::CartService;
use crate::state::AppState;

/// Build the carts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/carts", get(view_cart).post(add_to_cart))
        .route("/carts/{id}", put(update_cart_item).delete(remove_cart_item))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to add an item to the cart.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub item_id: ItemId,
    /// Zero or absent adds a single unit.
    #[serde(default)]
    pub quantity: i32,
}

/// Request to set a cart item's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// Response for a changed cart line.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub message: &'static str,
    pub cart_item: CartItem,
}

// =============================================================================
// Handlers
// =============================================================================

async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>), AppError> {
    let cart_item = CartService::new(state.store())
        .add_item(user.id, body.item_id, body.quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse {
            message: "Item added to cart",
            cart_item,
        }),
    ))
}

async fn update_cart_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(body): ApiJson<UpdateCartItemRequest>,
) -> Result<Json<CartItemResponse>, AppError> {
    let cart_item = CartService::new(state.store())
        .update_item_quantity(user.id, id, body.quantity)
        .await?;
    Ok(Json(CartItemResponse {
        message: "Cart item updated",
        cart_item,
    }))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<CartItemId>,
) -> Result<Json<MessageResponse>, AppError> {
    CartService::new(state.store())
        .remove_item(user.id, id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Item removed from cart",
    }))
}

async fn view_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CartView>, AppError> {
    let view = CartService::new(state.store()).view_cart(user.id).await?;
    Ok(Json(view))
}
