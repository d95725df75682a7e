//! Seller-scoped projection of a checkout.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, StoreId, UserId};
use serde::{Deserialize, Serialize};

use crate::{
    DomainError, ItemAction, ItemStatus, Money, Order, SellerPaymentStatus, ShippingAddress,
};

/// One product line as the seller sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_image: Vec<String>,
    pub order_status: ItemStatus,
    pub quantity: u32,
    pub price: Money,

    /// Buyer identity, copied so the seller view needs no join.
    pub user_email: UserId,
    pub address_shipping: ShippingAddress,
}

impl SellerOrderItem {
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }

    /// Checks that `action` is allowed from the item's current status.
    pub fn check(&self, action: ItemAction) -> Result<ItemStatus, DomainError> {
        self.order_status
            .transition(action)
            .map_err(|e| e.for_item(&self.product_id))
    }
}

/// The slice of one checkout owned by a single store.
///
/// Keyed by `(order_id, store_id)`; shares `order_id` with the buyer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerOrder {
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub seller: UserId,
    pub order_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Sum of this seller's item line totals at creation.
    pub total_price: Money,
    pub payment_status: SellerPaymentStatus,
    pub items: Vec<SellerOrderItem>,
}

impl SellerOrder {
    /// Builds the seller order for `store_id` out of a buyer order.
    ///
    /// Items are copied with their current status; the payment flag starts
    /// as `UNPAID`.
    pub fn fan_out(order: &Order, store_id: &StoreId, seller: UserId) -> Self {
        let items: Vec<SellerOrderItem> = order
            .items_for_store(store_id)
            .map(|i| SellerOrderItem {
                product_id: i.product_id.clone(),
                product_name: i.product_name.clone(),
                product_image: i.product_image.clone(),
                order_status: i.order_status,
                quantity: i.quantity,
                price: i.price,
                user_email: order.buyer.clone(),
                address_shipping: order.address_shipping.clone(),
            })
            .collect();
        let total_price = items.iter().map(SellerOrderItem::total_price).sum();

        Self {
            order_id: order.order_id,
            store_id: store_id.clone(),
            seller,
            order_date: order.order_date,
            updated_at: order.order_date,
            total_price,
            payment_status: SellerPaymentStatus::Unpaid,
            items,
        }
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&SellerOrderItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    pub fn item_mut(&mut self, product_id: &ProductId) -> Option<&mut SellerOrderItem> {
        self.items.iter_mut().find(|i| &i.product_id == product_id)
    }

    pub fn remove_item(&mut self, product_id: &ProductId) -> Option<SellerOrderItem> {
        let idx = self.items.iter().position(|i| &i.product_id == product_id)?;
        Some(self.items.remove(idx))
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.item(product_id).is_some()
    }

    pub fn is_owned_by(&self, seller: &UserId) -> bool {
        &self.seller == seller
    }
}
