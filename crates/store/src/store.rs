use async_trait::async_trait;
use common::{OrderId, ProductId, StoreId, UserId};
use domain::{ItemStatus, Order, Payment, PaymentConfirmation, SalesReport, SellerOrder};

use crate::Result;

/// Result of a status-guarded write.
///
/// Every item or payment write is a compare-and-set against the current
/// stored status, so two racing writers can never both succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The guard matched and the document was changed.
    Applied,

    /// The document was already in the target state; nothing was written.
    AlreadyApplied,

    /// The current status matched neither the guard nor the target.
    Conflict { actual: ItemStatus },

    /// The document or the item inside it does not exist.
    Missing,
}

impl WriteOutcome {
    /// Returns true if the target state now holds.
    pub fn is_effective(&self) -> bool {
        matches!(self, WriteOutcome::Applied | WriteOutcome::AlreadyApplied)
    }
}

/// Persistence for buyer orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order. Fails with `Duplicate` if the id exists.
    async fn insert(&self, order: &Order) -> Result<()>;

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Orders of one buyer, newest first.
    async fn list_by_buyer(&self, buyer: &UserId) -> Result<Vec<Order>>;

    /// Every stored order id.
    async fn list_ids(&self) -> Result<Vec<OrderId>>;

    /// Deletes an order. Returns false if it did not exist.
    async fn delete(&self, order_id: OrderId) -> Result<bool>;

    /// Sets one item's status if its current status is in `expected`.
    async fn set_item_status(
        &self,
        order_id: OrderId,
        product_id: &ProductId,
        expected: &[ItemStatus],
        target: ItemStatus,
    ) -> Result<WriteOutcome>;

    /// Moves every item currently in `from` to `to`, leaving others alone.
    ///
    /// `AlreadyApplied` when no item was in `from`.
    async fn promote_items(
        &self,
        order_id: OrderId,
        from: ItemStatus,
        to: ItemStatus,
    ) -> Result<WriteOutcome>;

    /// Removes one item if its current status equals `expected`.
    async fn remove_item(
        &self,
        order_id: OrderId,
        product_id: &ProductId,
        expected: ItemStatus,
    ) -> Result<WriteOutcome>;

    /// Marks the payment mirror as `SUCCESS` unless it already is.
    async fn confirm_payment(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<WriteOutcome>;
}

/// Persistence for seller orders, keyed by `(order_id, store_id)`.
#[async_trait]
pub trait SellerOrderStore: Send + Sync {
    /// Inserts a new seller order. Fails with `Duplicate` if the key exists.
    async fn insert(&self, order: &SellerOrder) -> Result<()>;

    async fn get(&self, order_id: OrderId, store_id: &StoreId) -> Result<Option<SellerOrder>>;

    /// Every seller order fanned out from one checkout, ordered by store id.
    async fn list_by_order(&self, order_id: OrderId) -> Result<Vec<SellerOrder>>;

    /// Every seller order owned by one seller, newest first.
    async fn list_by_seller(&self, seller: &UserId) -> Result<Vec<SellerOrder>>;

    /// Deletes a seller order. Returns false if it did not exist.
    async fn delete(&self, order_id: OrderId, store_id: &StoreId) -> Result<bool>;

    /// Sets one item's status if its current status is in `expected`.
    async fn set_item_status(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        product_id: &ProductId,
        expected: &[ItemStatus],
        target: ItemStatus,
    ) -> Result<WriteOutcome>;

    /// Removes one item if its current status equals `expected`.
    async fn remove_item(
        &self,
        order_id: OrderId,
        store_id: &StoreId,
        product_id: &ProductId,
        expected: ItemStatus,
    ) -> Result<WriteOutcome>;

    /// Flags the seller order as paid and moves its `PENDING` items to
    /// `PROCESSED` in one document write.
    async fn confirm_payment(&self, order_id: OrderId, store_id: &StoreId)
    -> Result<WriteOutcome>;
}

/// Persistence for payment records, one per order.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new payment. Fails with `Duplicate` if one exists for the order.
    async fn insert(&self, payment: &Payment) -> Result<()>;

    async fn get(&self, order_id: OrderId) -> Result<Option<Payment>>;

    /// Marks the payment `SUCCESS` unless it already is.
    async fn confirm(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<WriteOutcome>;

    /// Records that the buyer was told about the payment.
    ///
    /// `Applied` for exactly one caller; later calls see `AlreadyApplied`.
    async fn mark_buyer_notified(&self, order_id: OrderId) -> Result<WriteOutcome>;
}

/// Persistence for per-store sales reports.
#[async_trait]
pub trait SalesReportStore: Send + Sync {
    /// Creates the zero-valued report for a new store.
    async fn insert(&self, report: &SalesReport) -> Result<()>;

    async fn get(&self, store_id: &StoreId) -> Result<Option<SalesReport>>;

    /// Overwrites the figures of an existing report.
    ///
    /// `Missing` if the store has no report.
    async fn replace(&self, report: &SalesReport) -> Result<WriteOutcome>;
}
