//! Repair sweep for mirrored documents.
//!
//! Convergence rules:
//! - the payment record is authoritative for payment state
//! - item statuses only move forward, so the further-advanced mirror wins
//! - an item present on one side only is removed from the other side if it
//!   is still `PENDING` there
//! - a paid order whose buyer was never told gets its payment notice

use common::{OrderId, ProductId, StoreId};
use domain::{ItemStatus, Order, PaymentConfirmation, PaymentStatus, SellerOrder};
use metrics::counter;
use serde::Serialize;
use store::WriteOutcome;

use super::OrderOrchestrator;
use crate::error::{FulfillmentError, Result};

/// What a repair step changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepairKind {
    /// The order's payment mirror was set to `SUCCESS`.
    OrderPayment,
    /// A seller order was flagged paid and its `PENDING` items processed.
    SellerPayment,
    /// The order's `PENDING` items were moved to `PROCESSED`.
    OrderItemsProcessed,
    /// The order item caught up with the seller order item.
    OrderItemAdvanced { from: ItemStatus, to: ItemStatus },
    /// The seller order item caught up with the order item.
    SellerItemAdvanced { from: ItemStatus, to: ItemStatus },
    /// A half-cancelled item was removed from the order.
    RemovedFromOrder,
    /// A half-cancelled item was removed from the seller order.
    RemovedFromSellerOrder,
    /// The buyer was sent the payment notice an earlier call never sent.
    BuyerNotified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairAction {
    pub store_id: Option<StoreId>,
    pub product_id: Option<ProductId>,
    #[serde(flatten)]
    pub kind: RepairKind,
}

/// Everything repaired for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub order_id: OrderId,
    pub actions: Vec<RepairAction>,
}

impl RepairReport {
    fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            actions: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.actions.is_empty()
    }

    fn push(&mut self, store_id: Option<&StoreId>, product_id: Option<&ProductId>, kind: RepairKind) {
        tracing::info!(order_id = %self.order_id, ?store_id, ?product_id, ?kind, "repaired");
        self.actions.push(RepairAction {
            store_id: store_id.cloned(),
            product_id: product_id.cloned(),
            kind,
        });
    }
}

/// Outcome of a sweep over every order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairSummary {
    pub scanned: usize,
    pub failed: usize,
    pub repaired: Vec<RepairReport>,
}

impl OrderOrchestrator {
    /// Converges one order with its seller orders and payment record.
    #[tracing::instrument(skip(self), fields(%order_id))]
    pub async fn repair_order(&self, order_id: OrderId) -> Result<RepairReport> {
        let mut report = RepairReport::new(order_id);

        let order = self.load_for_repair(order_id).await?;
        let seller_orders = self.stores.seller_orders.list_by_order(order_id).await?;
        let paid = self
            .stores
            .payments
            .get(order_id)
            .await?
            .filter(|p| p.status == PaymentStatus::Success);
        if let Some(payment) = &paid {
            let confirmation = PaymentConfirmation {
                payment_method: payment.payment_method.clone().unwrap_or_default(),
                transaction_id: payment.transaction_id.clone().unwrap_or_default(),
            };
            self.repair_payment(&order, &seller_orders, &confirmation, &mut report)
                .await?;
        }

        // Payment repair may have moved items; compare fresh copies.
        let order = self.load_for_repair(order_id).await?;
        let seller_orders = self.stores.seller_orders.list_by_order(order_id).await?;
        for seller_order in &seller_orders {
            self.repair_seller_items(&order, seller_order, &mut report)
                .await?;
        }
        self.repair_order_items(&order, &seller_orders, &mut report)
            .await?;

        if let Some(payment) = &paid
            && self.announce_payment(payment).await?
        {
            report.push(None, None, RepairKind::BuyerNotified);
        }

        if !report.is_clean() {
            counter!("order_repairs_total").increment(report.actions.len() as u64);
            self.invalidate_order_views(order_id, &order.buyer, seller_orders.iter().map(|s| &s.seller))
                .await;
        }
        Ok(report)
    }

    /// Runs [`repair_order`](Self::repair_order) for every stored order.
    ///
    /// Orders that fail to repair are logged and counted; the sweep goes on.
    #[tracing::instrument(skip(self))]
    pub async fn repair_all(&self) -> Result<RepairSummary> {
        let mut summary = RepairSummary::default();
        for order_id in self.stores.orders.list_ids().await? {
            summary.scanned += 1;
            match self.repair_order(order_id).await {
                Ok(report) if report.is_clean() => {}
                Ok(report) => summary.repaired.push(report),
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(%order_id, error = %e, "order repair failed");
                }
            }
        }
        tracing::info!(
            scanned = summary.scanned,
            repaired = summary.repaired.len(),
            failed = summary.failed,
            "repair sweep finished"
        );
        Ok(summary)
    }

    async fn load_for_repair(&self, order_id: OrderId) -> Result<Order> {
        self.stores
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }

    async fn repair_payment(
        &self,
        order: &Order,
        seller_orders: &[SellerOrder],
        confirmation: &PaymentConfirmation,
        report: &mut RepairReport,
    ) -> Result<()> {
        let order_id = order.order_id;

        if self
            .stores
            .orders
            .confirm_payment(order_id, confirmation)
            .await?
            == WriteOutcome::Applied
        {
            report.push(None, None, RepairKind::OrderPayment);
        }

        for seller_order in seller_orders {
            if self
                .stores
                .seller_orders
                .confirm_payment(order_id, &seller_order.store_id)
                .await?
                == WriteOutcome::Applied
            {
                report.push(Some(&seller_order.store_id), None, RepairKind::SellerPayment);
            }
        }

        if self
            .stores
            .orders
            .promote_items(order_id, ItemStatus::Pending, ItemStatus::Processed)
            .await?
            == WriteOutcome::Applied
        {
            report.push(None, None, RepairKind::OrderItemsProcessed);
        }
        Ok(())
    }

    async fn repair_seller_items(
        &self,
        order: &Order,
        seller_order: &SellerOrder,
        report: &mut RepairReport,
    ) -> Result<()> {
        let order_id = order.order_id;
        let store_id = &seller_order.store_id;

        for seller_item in &seller_order.items {
            let product_id = &seller_item.product_id;
            let seller_status = seller_item.order_status;

            let Some(order_item) = order.item(product_id) else {
                if seller_status == ItemStatus::Pending
                    && self
                        .stores
                        .seller_orders
                        .remove_item(order_id, store_id, product_id, ItemStatus::Pending)
                        .await?
                        == WriteOutcome::Applied
                {
                    report.push(Some(store_id), Some(product_id), RepairKind::RemovedFromSellerOrder);
                }
                continue;
            };
            let order_status = order_item.order_status;

            if seller_status.is_ahead_of(order_status) {
                let outcome = self
                    .stores
                    .orders
                    .set_item_status(order_id, product_id, &[order_status], seller_status)
                    .await?;
                if outcome == WriteOutcome::Applied {
                    report.push(
                        Some(store_id),
                        Some(product_id),
                        RepairKind::OrderItemAdvanced {
                            from: order_status,
                            to: seller_status,
                        },
                    );
                }
            } else if order_status.is_ahead_of(seller_status) {
                let outcome = self
                    .stores
                    .seller_orders
                    .set_item_status(order_id, store_id, product_id, &[seller_status], order_status)
                    .await?;
                if outcome == WriteOutcome::Applied {
                    report.push(
                        Some(store_id),
                        Some(product_id),
                        RepairKind::SellerItemAdvanced {
                            from: seller_status,
                            to: order_status,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn repair_order_items(
        &self,
        order: &Order,
        seller_orders: &[SellerOrder],
        report: &mut RepairReport,
    ) -> Result<()> {
        let order_id = order.order_id;

        for item in &order.items {
            let Some(seller_order) = seller_orders.iter().find(|s| s.store_id == item.store_id)
            else {
                tracing::warn!(
                    %order_id,
                    store_id = %item.store_id,
                    product_id = %item.product_id,
                    "no seller order for store, cannot repair item"
                );
                continue;
            };
            if seller_order.contains(&item.product_id) || item.order_status != ItemStatus::Pending {
                continue;
            }
            if self
                .stores
                .orders
                .remove_item(order_id, &item.product_id, ItemStatus::Pending)
                .await?
                == WriteOutcome::Applied
            {
                report.push(
                    Some(&item.store_id),
                    Some(&item.product_id),
                    RepairKind::RemovedFromOrder,
                );
            }
        }
        Ok(())
    }
}
