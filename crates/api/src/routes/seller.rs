//! Seller-facing order and sales report endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ProductId, StoreId};
use domain::{SalesReport, SellerOrder};
use fulfillment::Actor;

use super::orders::StatusUpdate;
use super::{AppState, CurrentUser, parse_order_id};
use crate::error::ApiError;

/// GET /seller/orders
pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(seller): CurrentUser,
) -> Result<Json<Vec<SellerOrder>>, ApiError> {
    Ok(Json(state.orchestrator.list_seller_orders(&seller).await?))
}

/// GET /seller/orders/{order_id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    CurrentUser(seller): CurrentUser,
    Path(order_id): Path<String>,
) -> Result<Json<SellerOrder>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    Ok(Json(
        state.orchestrator.get_seller_order(&seller, order_id).await?,
    ))
}

/// PATCH /seller/orders/{order_id}/items/{product_id}: ships the item.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(seller): CurrentUser,
    Path((order_id, product_id)): Path<(String, String)>,
    Json(body): Json<StatusUpdate>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    state
        .orchestrator
        .ship_order_item(&seller, order_id, &ProductId::new(product_id), body.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /seller/orders/{order_id}/items/{product_id}
pub async fn cancel_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(seller): CurrentUser,
    Path((order_id, product_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    state
        .orchestrator
        .cancel_order_item(&Actor::Seller(seller), order_id, &ProductId::new(product_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /seller/stores/{store_id}/sales-report
pub async fn sales_report(
    State(state): State<Arc<AppState>>,
    CurrentUser(seller): CurrentUser,
    Path(store_id): Path<String>,
) -> Result<Json<SalesReport>, ApiError> {
    Ok(Json(
        state
            .orchestrator
            .get_sales_report(&seller, &StoreId::new(store_id))
            .await?,
    ))
}
