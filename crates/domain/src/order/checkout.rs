//! Cart to order conversion and seller fan-out.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{OrderId, StoreId, UserId};

use super::{ItemStatus, Order, OrderItem, PaymentMirror, ShippingAddress};
use crate::{CartItem, DomainError, SellerOrder};

/// Builds a buyer order from the selected lines of a cart.
///
/// Every item starts `PENDING` and the total is the sum of the selected
/// lines' `price * quantity`.
pub fn checkout(
    order_id: OrderId,
    buyer: UserId,
    address: Option<ShippingAddress>,
    cart: &[CartItem],
    now: DateTime<Utc>,
) -> Result<Order, DomainError> {
    let address_shipping = address.ok_or(DomainError::MissingShippingAddress)?;

    if cart.is_empty() {
        return Err(DomainError::EmptyCart);
    }

    let selected: Vec<&CartItem> = cart.iter().filter(|c| c.selected).collect();
    if selected.is_empty() {
        return Err(DomainError::NoSelectedItems);
    }

    if let Some(bad) = selected.iter().find(|c| c.quantity == 0) {
        return Err(DomainError::InvalidQuantity {
            product_id: bad.product_id.clone(),
        });
    }

    let items: Vec<OrderItem> = selected
        .into_iter()
        .map(|c| OrderItem {
            product_id: c.product_id.clone(),
            product_name: c.product_name.clone(),
            product_image: c.product_image.clone(),
            store_id: c.store_id.clone(),
            order_status: ItemStatus::Pending,
            quantity: c.quantity,
            price: c.price,
        })
        .collect();
    let total_price = items.iter().map(OrderItem::total_price).sum();

    Ok(Order {
        order_id,
        buyer,
        order_date: now,
        updated_at: now,
        total_price,
        address_shipping,
        payment: PaymentMirror::default(),
        items,
    })
}

/// Splits an order into one seller order per store.
///
/// `sellers` must name the owner of every store the order touches.
pub fn fan_out(
    order: &Order,
    sellers: &BTreeMap<StoreId, UserId>,
) -> Result<Vec<SellerOrder>, DomainError> {
    order
        .store_ids()
        .into_iter()
        .map(|store_id| {
            let seller = sellers
                .get(&store_id)
                .cloned()
                .ok_or_else(|| DomainError::SellerUnresolved {
                    store_id: store_id.clone(),
                })?;
            Ok(SellerOrder::fan_out(order, &store_id, seller))
        })
        .collect()
}
