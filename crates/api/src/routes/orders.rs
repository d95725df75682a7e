//! Buyer-facing order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ProductId};
use domain::{ItemStatus, Order};
use fulfillment::Actor;
use serde::{Deserialize, Serialize};

use super::{AppState, CurrentUser, parse_order_id};
use crate::error::ApiError;

/// Body of an item status update.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ItemStatus,
}

#[derive(Debug, Serialize)]
pub struct CreatedOrder {
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
pub struct PaymentSession {
    pub redirect_url: String,
}

/// POST /orders: checks out the buyer's selected cart items.
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(buyer): CurrentUser,
) -> Result<(StatusCode, Json<CreatedOrder>), ApiError> {
    let order_id = state.orchestrator.create_order(&buyer).await?;
    Ok((StatusCode::CREATED, Json(CreatedOrder { order_id })))
}

/// GET /orders
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(buyer): CurrentUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orchestrator.list_orders(&buyer).await?))
}

/// GET /orders/{order_id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(buyer): CurrentUser,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    Ok(Json(state.orchestrator.get_order(&buyer, order_id).await?))
}

/// PATCH /orders/{order_id}/items/{product_id}: buyer confirms receipt.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(buyer): CurrentUser,
    Path((order_id, product_id)): Path<(String, String)>,
    Json(body): Json<StatusUpdate>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    state
        .orchestrator
        .finish_order_item(&buyer, order_id, &ProductId::new(product_id), body.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /orders/{order_id}/items/{product_id}
pub async fn cancel_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(buyer): CurrentUser,
    Path((order_id, product_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    state
        .orchestrator
        .cancel_order_item(&Actor::Buyer(buyer), order_id, &ProductId::new(product_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{order_id}/payment: opens (or reuses) a gateway session.
pub async fn initialize_payment(
    State(state): State<Arc<AppState>>,
    CurrentUser(buyer): CurrentUser,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentSession>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    let redirect_url = state
        .orchestrator
        .initialize_payment(&buyer, order_id)
        .await?;
    Ok(Json(PaymentSession { redirect_url }))
}
