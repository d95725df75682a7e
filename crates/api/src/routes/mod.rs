//! Route handlers and the state they share.

pub mod admin;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod seller;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{OrderId, UserId};
use fulfillment::OrderOrchestrator;

use crate::error::ApiError;

/// Header carrying the authenticated user's email.
pub const USER_HEADER: &str = "x-user-email";

/// Shared application state for all route handlers.
pub struct AppState {
    pub orchestrator: OrderOrchestrator,
}

/// The calling user, taken from the [`USER_HEADER`] set by the upstream
/// authentication layer.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CurrentUser(UserId::new(v)))
            .ok_or(ApiError::Unauthorized)
    }
}

pub(crate) fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(raw).map_err(|_| ApiError::BadRequest(format!("invalid order id: {raw}")))
}
