//! Domain error types.

use common::{ProductId, StoreId};
use thiserror::Error;

use crate::order::{ItemAction, ItemStatus};

/// Errors raised by the pure domain rules.
///
/// Every variant is a caller mistake or a violated precondition; none of
/// them is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A status transition was attempted from the wrong state.
    #[error("cannot {action} item: expected {expected}, found {actual}")]
    InvalidTransition {
        action: ItemAction,
        expected: ItemStatus,
        actual: ItemStatus,
    },

    /// A status transition on a named item was attempted from the wrong state.
    #[error("cannot {action} item {product_id}: expected {expected}, found {actual}")]
    ItemTransition {
        product_id: ProductId,
        action: ItemAction,
        expected: ItemStatus,
        actual: ItemStatus,
    },

    /// The caller asked for a status the operation does not produce.
    #[error("requested status {requested} is not allowed here, expected {allowed}")]
    UnsupportedStatus {
        requested: ItemStatus,
        allowed: ItemStatus,
    },

    /// The buyer has no cart or the cart holds no items.
    #[error("cart is empty")]
    EmptyCart,

    /// The cart has items but none are selected for checkout.
    #[error("no cart items are selected for checkout")]
    NoSelectedItems,

    /// The buyer has no shipping address on file.
    #[error("buyer has no shipping address on file")]
    MissingShippingAddress,

    /// A selected cart line carries a zero quantity.
    #[error("invalid quantity for product {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: ProductId },

    /// No seller was supplied for a store the order touches.
    #[error("no seller resolved for store {store_id}")]
    SellerUnresolved { store_id: StoreId },

    /// The named product is not part of the order.
    #[error("item not found: {product_id}")]
    ItemNotFound { product_id: ProductId },
}

impl DomainError {
    /// Attaches the product id to a bare transition error.
    pub fn for_item(self, product_id: &ProductId) -> Self {
        match self {
            DomainError::InvalidTransition {
                action,
                expected,
                actual,
            } => DomainError::ItemTransition {
                product_id: product_id.clone(),
                action,
                expected,
                actual,
            },
            other => other,
        }
    }
}
