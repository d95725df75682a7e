//! Buyer-facing order document.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, StoreId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderItem, ShippingAddress};
use crate::{DomainError, PaymentStatus};

/// Denormalized copy of the payment record carried on the buyer order.
///
/// Eventually consistent with the authoritative [`crate::Payment`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMirror {
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
}

/// One checkout as the buyer sees it, spanning every seller involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub buyer: UserId,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Sum of the item line totals at creation; cancellation does not change it.
    pub total_price: Money,

    /// Snapshot of the buyer's address at checkout time.
    pub address_shipping: ShippingAddress,
    pub payment: PaymentMirror,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Returns true if the order belongs to `buyer`.
    pub fn is_owned_by(&self, buyer: &UserId) -> bool {
        &self.buyer == buyer
    }

    /// Returns the item for a product, if present.
    pub fn item(&self, product_id: &ProductId) -> Option<&OrderItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    /// Returns the item for a product or an `ItemNotFound` error.
    pub fn require_item(&self, product_id: &ProductId) -> Result<&OrderItem, DomainError> {
        self.item(product_id)
            .ok_or_else(|| DomainError::ItemNotFound {
                product_id: product_id.clone(),
            })
    }

    /// Returns a mutable reference to the item for a product.
    pub fn item_mut(&mut self, product_id: &ProductId) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|i| &i.product_id == product_id)
    }

    /// Removes the item for a product, returning it.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Option<OrderItem> {
        let idx = self.items.iter().position(|i| &i.product_id == product_id)?;
        Some(self.items.remove(idx))
    }

    /// Distinct stores touched by this order, in a stable order.
    pub fn store_ids(&self) -> BTreeSet<StoreId> {
        self.items.iter().map(|i| i.store_id.clone()).collect()
    }

    /// Items owned by one store.
    pub fn items_for_store<'a>(
        &'a self,
        store_id: &'a StoreId,
    ) -> impl Iterator<Item = &'a OrderItem> + 'a {
        self.items.iter().filter(move |i| &i.store_id == store_id)
    }

    /// Sum of the current items' line totals.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::total_price).sum()
    }
}
