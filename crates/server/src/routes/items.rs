//! Catalog routes.
//!
//! Listing and lookup are public; writes require an admin token.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use rust_decimal::Decimal;
use serde::Deserialize;

use shopcart_core::ItemId;

use super::{ApiJson, ApiPath, MessageResponse};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::models::Item;
use crate::services::CatalogService;
use crate::state::AppState;

/// Build the items router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
}

// =============================================================================
// Request Types
// =============================================================================

/// Request to create an item.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
}

/// Request to update an item. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, AppError> {
    let items = CatalogService::new(state.store()).list_items().await?;
    Ok(Json(items))
}

async fn get_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ItemId>,
) -> Result<Json<Item>, AppError> {
    let item = CatalogService::new(state.store()).get_item(id).await?;
    Ok(Json(item))
}

async fn create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    let item = CatalogService::new(state.store())
        .create_item(&user.actor(), &body.name, body.price)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<ItemId>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<Json<Item>, AppError> {
    let item = CatalogService::new(state.store())
        .update_item(&user.actor(), id, body.name.as_deref(), body.price)
        .await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<ItemId>,
) -> Result<Json<MessageResponse>, AppError> {
    CatalogService::new(state.store())
        .delete_item(&user.actor(), id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Item deleted",
    }))
}
