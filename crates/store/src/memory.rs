use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use common::{OrderId, ProductId, StoreId, UserId};
use domain::{ItemStatus, Order, Payment, PaymentConfirmation, SalesReport, SellerOrder};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError, guard,
    store::{OrderStore, PaymentStore, SalesReportStore, SellerOrderStore, WriteOutcome},
};

/// Write fault injection for tests.
///
/// Lets a test allow `n` more writes and fail every write after that, to
/// exercise partial fan-out and compensation paths.
#[derive(Debug, Clone)]
struct Faults {
    remaining: Arc<AtomicI64>,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            remaining: Arc::new(AtomicI64::new(-1)),
        }
    }
}

impl Faults {
    fn fail_after(&self, writes: usize) {
        self.remaining.store(writes as i64, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.remaining.store(-1, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        let previous = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            });
        match previous {
            Ok(_) => Ok(()),
            Err(n) if n < 0 => Ok(()),
            Err(_) => Err(StoreError::Unavailable("injected write failure".into())),
        }
    }
}

macro_rules! fault_controls {
    ($ty:ty) => {
        impl $ty {
            /// Allows `writes` more writes, then fails every write.
            pub fn fail_writes_after(&self, writes: usize) {
                self.faults.fail_after(writes);
            }

            /// Fails every write from now on.
            pub fn fail_writes(&self) {
                self.faults.fail_after(0);
            }

            /// Stops failing writes.
            pub fn clear_faults(&self) {
                self.faults.clear();
            }
        }
    };
}

/// In-memory order store.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    faults: Faults,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

fault_controls!(InMemoryOrderStore);

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.faults.check()?;
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.order_id) {
            return Err(StoreError::Duplicate {
                entity: "order",
                key: order.order_id.to_string(),
            });
        }
        orders.insert(order.order_id, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn list_by_buyer(&self, buyer: &UserId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut result: Vec<_> = orders
            .values()
            .filter(|o| &o.buyer == buyer)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(result)
    }

    async fn list_ids(&self) -> Result<Vec<OrderId>> {
        let mut ids: Vec<_> = self.orders.read().await.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, order_id: OrderId) -> Result<bool> {
        self.faults.check()?;
        Ok(self.orders.write().await.remove(&order_id).is_some())
    }

    async fn set_item_status(
        &self,
        order_id: OrderId,
        product_id: &ProductId,
        expected: &[ItemStatus],
        target: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut orders = self.orders.write().await;
        Ok(match orders.get_mut(&order_id) {
            Some(order) => guard::order_item_status(order, product_id, expected, target),
            None => WriteOutcome::Missing,
        })
    }

    async fn promote_items(
        &self,
        order_id: OrderId,
        from: ItemStatus,
        to: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut orders = self.orders.write().await;
        Ok(match orders.get_mut(&order_id) {
            Some(order) => guard::order_promote(order, from, to),
            None => WriteOutcome::Missing,
        })
    }

    async fn remove_item(
        &self,
        order_id: OrderId,
        product_id: &ProductId,
        expected: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut orders = self.orders.write().await;
        Ok(match orders.get_mut(&order_id) {
            Some(order) => guard::order_remove_item(order, product_id, expected),
            None => WriteOutcome::Missing,
        })
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut orders = self.orders.write().await;
        Ok(match orders.get_mut(&order_id) {
            Some(order) => guard::order_confirm_payment(order, confirmation),
            None => WriteOutcome::Missing,
        })
    }
}

/// In-memory seller order store.
#[derive(Clone, Default)]
pub struct InMemorySellerOrderStore {
    orders: Arc<RwLock<HashMap<(OrderId, StoreId), SellerOrder>>>,
    faults: Faults,
}

impl InMemorySellerOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored seller orders.
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }

    async fn mutate(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        f: impl FnOnce(&mut SellerOrder) -> WriteOutcome,
    ) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut orders = self.orders.write().await;
        Ok(match orders.get_mut(&(order_id, store_id.clone())) {
            Some(order) => f(order),
            None => WriteOutcome::Missing,
        })
    }
}

fault_controls!(InMemorySellerOrderStore);

#[async_trait]
impl SellerOrderStore for InMemorySellerOrderStore {
    async fn insert(&self, order: &SellerOrder) -> Result<()> {
        self.faults.check()?;
        let key = (order.order_id, order.store_id.clone());
        let mut orders = self.orders.write().await;
        if orders.contains_key(&key) {
            return Err(StoreError::Duplicate {
                entity: "seller order",
                key: format!("{}/{}", order.order_id, order.store_id),
            });
        }
        orders.insert(key, order.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId, store_id: &StoreId) -> Result<Option<SellerOrder>> {
        Ok(self
            .orders
            .read()
            .await
            .get(&(order_id, store_id.clone()))
            .cloned())
    }

    async fn list_by_order(&self, order_id: OrderId) -> Result<Vec<SellerOrder>> {
        let orders = self.orders.read().await;
        let mut result: Vec<_> = orders
            .values()
            .filter(|o| o.order_id == order_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.store_id.cmp(&b.store_id));
        Ok(result)
    }

    async fn list_by_seller(&self, seller: &UserId) -> Result<Vec<SellerOrder>> {
        let orders = self.orders.read().await;
        let mut result: Vec<_> = orders
            .values()
            .filter(|o| &o.seller == seller)
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.order_date
                .cmp(&a.order_date)
                .then_with(|| a.store_id.cmp(&b.store_id))
        });
        Ok(result)
    }

    async fn delete(&self, order_id: OrderId, store_id: &StoreId) -> Result<bool> {
        self.faults.check()?;
        Ok(self
            .orders
            .write()
            .await
            .remove(&(order_id, store_id.clone()))
            .is_some())
    }

    async fn set_item_status(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        product_id: &ProductId,
        expected: &[ItemStatus],
        target: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, store_id, |o| {
            guard::seller_item_status(o, product_id, expected, target)
        })
        .await
    }

    async fn remove_item(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        product_id: &ProductId,
        expected: ItemStatus,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, store_id, |o| {
            guard::seller_remove_item(o, product_id, expected)
        })
        .await
    }

    async fn confirm_payment(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
    ) -> Result<WriteOutcome> {
        self.mutate(order_id, store_id, guard::seller_confirm_payment)
            .await
    }
}

/// In-memory payment store.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<OrderId, Payment>>>,
    faults: Faults,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fault_controls!(InMemoryPaymentStore);

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        self.faults.check()?;
        let mut payments = self.payments.write().await;
        if payments.contains_key(&payment.order_id) {
            return Err(StoreError::Duplicate {
                entity: "payment",
                key: payment.order_id.to_string(),
            });
        }
        payments.insert(payment.order_id, payment.clone());
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Payment>> {
        Ok(self.payments.read().await.get(&order_id).cloned())
    }

    async fn confirm(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut payments = self.payments.write().await;
        Ok(match payments.get_mut(&order_id) {
            Some(payment) => guard::payment_confirm(payment, confirmation),
            None => WriteOutcome::Missing,
        })
    }

    async fn mark_buyer_notified(&self, order_id: OrderId) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut payments = self.payments.write().await;
        Ok(match payments.get_mut(&order_id) {
            Some(payment) => guard::payment_mark_notified(payment),
            None => WriteOutcome::Missing,
        })
    }
}

/// In-memory sales report store.
#[derive(Clone, Default)]
pub struct InMemorySalesReportStore {
    reports: Arc<RwLock<HashMap<StoreId, SalesReport>>>,
    faults: Faults,
}

impl InMemorySalesReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fault_controls!(InMemorySalesReportStore);

#[async_trait]
impl SalesReportStore for InMemorySalesReportStore {
    async fn insert(&self, report: &SalesReport) -> Result<()> {
        self.faults.check()?;
        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.store_id) {
            return Err(StoreError::Duplicate {
                entity: "sales report",
                key: report.store_id.to_string(),
            });
        }
        reports.insert(report.store_id.clone(), report.clone());
        Ok(())
    }

    async fn get(&self, store_id: &StoreId) -> Result<Option<SalesReport>> {
        Ok(self.reports.read().await.get(store_id).cloned())
    }

    async fn replace(&self, report: &SalesReport) -> Result<WriteOutcome> {
        self.faults.check()?;
        let mut reports = self.reports.write().await;
        Ok(match reports.get_mut(&report.store_id) {
            Some(existing) => {
                *existing = report.clone();
                WriteOutcome::Applied
            }
            None => WriteOutcome::Missing,
        })
    }
}
