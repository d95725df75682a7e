//! Compensation log for order creation.
//!
//! Creation writes the buyer order and then one seller order per store.
//! Each completed write is recorded; if a later write fails the recorded
//! writes are undone in reverse order.

use common::{OrderId, StoreId};
use metrics::counter;
use store::{OrderStore, SellerOrderStore};

/// A document written during creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompletedWrite {
    Order(OrderId),
    SellerOrder(OrderId, StoreId),
}

impl CompletedWrite {
    fn name(&self) -> &'static str {
        match self {
            CompletedWrite::Order(_) => "delete_order",
            CompletedWrite::SellerOrder(..) => "delete_seller_order",
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CompensationLog {
    completed: Vec<CompletedWrite>,
}

impl CompensationLog {
    pub(crate) fn record(&mut self, write: CompletedWrite) {
        self.completed.push(write);
    }

    /// Undoes every recorded write, newest first.
    ///
    /// Keeps going past failures and returns how many undo steps failed.
    pub(crate) async fn compensate(
        self,
        orders: &dyn OrderStore,
        seller_orders: &dyn SellerOrderStore,
    ) -> usize {
        let mut failures = 0;
        for write in self.completed.into_iter().rev() {
            let result = match &write {
                CompletedWrite::Order(order_id) => orders.delete(*order_id).await,
                CompletedWrite::SellerOrder(order_id, store_id) => {
                    seller_orders.delete(*order_id, store_id).await
                }
            };
            match result {
                Ok(_) => {
                    tracing::info!(step = write.name(), ?write, "compensation step completed");
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(
                        step = write.name(),
                        ?write,
                        error = %e,
                        "compensation step failed"
                    );
                    counter!("order_compensation_failures_total").increment(1);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{ProductId, UserId};
    use domain::{ItemStatus, Money, Order, OrderItem, PaymentMirror, SellerOrder, ShippingAddress};
    use store::{InMemoryOrderStore, InMemorySellerOrderStore};

    use super::*;

    fn order() -> Order {
        let now = Utc::now();
        Order {
            order_id: OrderId::new(),
            buyer: UserId::new("b@example.com"),
            order_date: now,
            updated_at: now,
            total_price: Money::from_cents(1000),
            address_shipping: ShippingAddress::default(),
            payment: PaymentMirror::default(),
            items: vec![OrderItem {
                product_id: ProductId::new("p1"),
                product_name: "One".into(),
                product_image: vec![],
                store_id: StoreId::new("A"),
                order_status: ItemStatus::Pending,
                quantity: 1,
                price: Money::from_cents(1000),
            }],
        }
    }

    #[tokio::test]
    async fn compensation_removes_recorded_documents() {
        let orders = InMemoryOrderStore::new();
        let seller_orders = InMemorySellerOrderStore::new();
        let order = order();
        let store_a = StoreId::new("A");
        let seller_order = SellerOrder::fan_out(&order, &store_a, UserId::new("s@example.com"));

        orders.insert(&order).await.unwrap();
        seller_orders.insert(&seller_order).await.unwrap();

        let mut log = CompensationLog::default();
        log.record(CompletedWrite::Order(order.order_id));
        log.record(CompletedWrite::SellerOrder(order.order_id, store_a.clone()));

        assert_eq!(log.compensate(&orders, &seller_orders).await, 0);
        assert!(orders.get(order.order_id).await.unwrap().is_none());
        assert!(
            seller_orders
                .get(order.order_id, &store_a)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn compensation_continues_past_failures() {
        let orders = InMemoryOrderStore::new();
        let seller_orders = InMemorySellerOrderStore::new();
        let order = order();
        orders.insert(&order).await.unwrap();
        seller_orders.fail_writes();

        let mut log = CompensationLog::default();
        log.record(CompletedWrite::Order(order.order_id));
        log.record(CompletedWrite::SellerOrder(
            order.order_id,
            StoreId::new("A"),
        ));

        assert_eq!(log.compensate(&orders, &seller_orders).await, 1);
        assert!(orders.get(order.order_id).await.unwrap().is_none());
    }
}
