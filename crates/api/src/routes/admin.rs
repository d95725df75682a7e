//! Operator endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use fulfillment::{RepairReport, RepairSummary};

use super::{AppState, parse_order_id};
use crate::error::ApiError;

/// POST /admin/orders/{order_id}/repair: converges an order with its mirrors.
pub async fn repair_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<RepairReport>, ApiError> {
    let order_id = parse_order_id(&order_id)?;
    Ok(Json(state.orchestrator.repair_order(order_id).await?))
}

/// POST /admin/repair: runs the repair sweep over every order now.
pub async fn repair_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RepairSummary>, ApiError> {
    Ok(Json(state.orchestrator.repair_all().await?))
}
