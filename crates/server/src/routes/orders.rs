//! Order routes.
//!
//! `/orders/user` and `/orders/admin` are registered as static segments, so
//! they take precedence over `/orders/{id}`.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use shopcart_core::{OrderId, Price};

use super::{ApiJson, ApiPath};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::{Order, OrderDetail, OrderLine, OrderWithUser};
use crate::services::OrderService;
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/user", get(list_user_orders))
        .route("/orders/admin", get(list_all_orders))
        .route("/orders/{id}", get(get_order).put(update_order_status))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub message: &'static str,
    pub order: Order,
    pub items: Vec<OrderLine>,
    pub total: Price,
}

/// Request to change an order's status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: &'static str,
    pub order: Order,
}

// =============================================================================
// Handlers
// =============================================================================

async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let placed = OrderService::new(state.store()).create_order(user.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            message: "Order created successfully",
            order: placed.order,
            items: placed.items,
            total: placed.total,
        }),
    ))
}

async fn list_user_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderService::new(state.store())
        .list_user_orders(user.id)
        .await?;
    Ok(Json(orders))
}

async fn list_all_orders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<OrderWithUser>>, AppError> {
    let orders = OrderService::new(state.store())
        .list_all_orders(&user.actor())
        .await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let detail = OrderService::new(state.store())
        .get_order(&user.actor(), id)
        .await?;
    Ok(Json(detail))
}

async fn update_order_status(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = OrderService::new(state.store())
        .update_order_status(&user.actor(), id, &body.status)
        .await?;
    Ok(Json(OrderResponse {
        message: "Order status updated",
        order,
    }))
}
