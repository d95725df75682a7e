//! Payment gateway webhook.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::{AppState, parse_order_id};
use crate::error::ApiError;

/// Notification body posted by the gateway. Only the order id is trusted;
/// the status is always re-queried from the gateway.
#[derive(Debug, Deserialize)]
pub struct GatewayNotification {
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub paid: bool,
}

/// POST /payments/notifications
///
/// Answers 200 whether or not the order turned out paid. Gateway failures
/// surface as 503 so the gateway redelivers.
pub async fn notify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GatewayNotification>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let raw = body
        .order_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("order_id is required".to_string()))?;
    let order_id = parse_order_id(raw.trim())?;

    let paid = state.orchestrator.reconcile_payment(order_id).await?;
    Ok(Json(ReconcileResponse { paid }))
}
