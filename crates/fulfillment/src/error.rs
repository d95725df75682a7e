//! Fulfillment error types.

use common::{OrderId, ProductId, StoreId, UserId};
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Coarse error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request violates a precondition. Never retried.
    Validation,
    /// An order, item, user or report does not exist.
    NotFound,
    /// A multi-document write stopped half way.
    PartialFanOut,
    /// A collaborator failed or timed out. Retryable by the caller.
    External,
    /// Storage or other unexpected failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PartialFanOut => "partial_fan_out",
            ErrorKind::External => "external",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors returned by the order orchestrator and its collaborators.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// A domain rule rejected the request.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("seller order not found: {0}")]
    SellerOrderNotFound(OrderId),

    #[error("payment not found for order {0}")]
    PaymentNotFound(OrderId),

    #[error("sales report not found for store {0}")]
    SalesReportNotFound(StoreId),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("buyer not found: {0}")]
    BuyerNotFound(UserId),

    #[error("no seller owns store {0}")]
    SellerNotFound(StoreId),

    /// The seller tried to ship before the order was paid.
    #[error("order {0} has not been paid")]
    Unpaid(OrderId),

    /// A cancel arrived after the payment record reached `SUCCESS`.
    #[error("cannot cancel item {product_id}: payment for order {order_id} expected PENDING, found SUCCESS")]
    AlreadyPaid {
        order_id: OrderId,
        product_id: ProductId,
    },

    /// One write of a multi-document update failed after others succeeded.
    #[error("partial fan-out at step '{step}': {reason}")]
    PartialFanOut { step: String, reason: String },

    /// A collaborator call failed.
    #[error("{operation} failed: {reason}")]
    External {
        operation: &'static str,
        reason: String,
    },

    /// A collaborator call exceeded its deadline.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    /// Shorthand for a failed collaborator call.
    pub fn external(operation: &'static str, reason: impl Into<String>) -> Self {
        FulfillmentError::External {
            operation,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FulfillmentError::Domain(DomainError::ItemNotFound { .. }) => ErrorKind::NotFound,
            FulfillmentError::Domain(_)
            | FulfillmentError::Unpaid(_)
            | FulfillmentError::AlreadyPaid { .. } => ErrorKind::Validation,
            FulfillmentError::OrderNotFound(_)
            | FulfillmentError::SellerOrderNotFound(_)
            | FulfillmentError::PaymentNotFound(_)
            | FulfillmentError::SalesReportNotFound(_)
            | FulfillmentError::ProductNotFound(_)
            | FulfillmentError::BuyerNotFound(_)
            | FulfillmentError::SellerNotFound(_) => ErrorKind::NotFound,
            FulfillmentError::PartialFanOut { .. } => ErrorKind::PartialFanOut,
            FulfillmentError::External { .. } | FulfillmentError::Timeout { .. } => {
                ErrorKind::External
            }
            FulfillmentError::Store(StoreError::Unavailable(_)) => ErrorKind::External,
            FulfillmentError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::External
    }

    /// Returns true for a status transition attempted from the wrong state.
    pub fn is_transition_conflict(&self) -> bool {
        matches!(
            self,
            FulfillmentError::Domain(
                DomainError::InvalidTransition { .. } | DomainError::ItemTransition { .. }
            ) | FulfillmentError::AlreadyPaid { .. }
        )
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
