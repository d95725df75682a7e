use common::{OrderId, ProductId, StoreId, UserId};
use domain::{DomainError, ItemAction, ItemStatus, PaymentStatus};
use metrics::counter;
use serde::{Deserialize, Serialize};
use store::WriteOutcome;

use super::OrderOrchestrator;
use crate::error::{FulfillmentError, Result};
use crate::services::Template;

/// Who is asking for a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "user", rename_all = "lowercase")]
pub enum Actor {
    Buyer(UserId),
    Seller(UserId),
}

impl Actor {
    pub fn user(&self) -> &UserId {
        match self {
            Actor::Buyer(user) | Actor::Seller(user) => user,
        }
    }

    fn role(&self) -> &'static str {
        match self {
            Actor::Buyer(_) => "buyer",
            Actor::Seller(_) => "seller",
        }
    }
}

/// Maps the outcome of the authoritative write of a transition.
fn first_write(
    outcome: WriteOutcome,
    product_id: &ProductId,
    action: ItemAction,
) -> Result<()> {
    match outcome {
        WriteOutcome::Applied | WriteOutcome::AlreadyApplied => Ok(()),
        WriteOutcome::Conflict { actual } => Err(DomainError::ItemTransition {
            product_id: product_id.clone(),
            action,
            expected: action.required_status(),
            actual,
        }
        .into()),
        WriteOutcome::Missing => Err(DomainError::ItemNotFound {
            product_id: product_id.clone(),
        }
        .into()),
    }
}

fn require_status(requested: ItemStatus, allowed: ItemStatus) -> Result<()> {
    if requested != allowed {
        return Err(DomainError::UnsupportedStatus { requested, allowed }.into());
    }
    Ok(())
}

impl OrderOrchestrator {
    /// Buyer confirms receipt of a shipped item.
    ///
    /// The buyer order is written first, then the seller mirror. The store's
    /// sales report is recomputed afterwards; a failed recompute is logged
    /// and left for the next trigger.
    #[tracing::instrument(skip(self), fields(%buyer, %order_id, %product_id))]
    pub async fn finish_order_item(
        &self,
        buyer: &UserId,
        order_id: OrderId,
        product_id: &ProductId,
        requested: ItemStatus,
    ) -> Result<()> {
        require_status(requested, ItemStatus::Finished)?;

        let order = self.owned_order(buyer, order_id).await?;
        let item = order.require_item(product_id)?;
        item.check(ItemAction::Finish)?;
        let store_id = item.store_id.clone();

        let seller_order = self
            .stores
            .seller_orders
            .get(order_id, &store_id)
            .await?
            .ok_or(FulfillmentError::SellerOrderNotFound(order_id))?;

        self.invalidate_order_views(order_id, buyer, [&seller_order.seller])
            .await;

        let outcome = self
            .stores
            .orders
            .set_item_status(
                order_id,
                product_id,
                &[ItemStatus::Shipped],
                ItemStatus::Finished,
            )
            .await?;
        first_write(outcome, product_id, ItemAction::Finish)?;

        let mirrored = self
            .mirror_write(
                "finish seller item",
                order_id,
                product_id,
                WriteOutcome::is_effective,
                || {
                    self.stores.seller_orders.set_item_status(
                        order_id,
                        &store_id,
                        product_id,
                        &[ItemStatus::Processed, ItemStatus::Shipped],
                        ItemStatus::Finished,
                    )
                },
            )
            .await;

        self.invalidate_order_views(order_id, buyer, [&seller_order.seller])
            .await;
        mirrored?;

        counter!("order_items_finished_total").increment(1);

        if let Err(e) = self
            .recompute_sales_report(&store_id, &seller_order.seller)
            .await
        {
            tracing::warn!(%store_id, error = %e, "sales report recompute failed");
        }

        self.notify(
            &seller_order.seller,
            Template::SellerFinishOrder,
            [
                ("order_id", order_id.to_string()),
                ("product_id", product_id.to_string()),
                ("username", buyer.to_string()),
            ],
        );
        Ok(())
    }

    /// Seller ships a paid, processed item.
    ///
    /// The seller order is written first, then the buyer mirror. Stock is
    /// decremented afterwards; a low remaining stock warns the seller.
    #[tracing::instrument(skip(self), fields(%seller, %order_id, %product_id))]
    pub async fn ship_order_item(
        &self,
        seller: &UserId,
        order_id: OrderId,
        product_id: &ProductId,
        requested: ItemStatus,
    ) -> Result<()> {
        require_status(requested, ItemStatus::Shipped)?;

        let seller_order = self.owned_seller_order(seller, order_id).await?;
        if !seller_order.payment_status.is_paid() {
            return Err(FulfillmentError::Unpaid(order_id));
        }
        let item = seller_order
            .item(product_id)
            .ok_or_else(|| DomainError::ItemNotFound {
                product_id: product_id.clone(),
            })?;
        item.check(ItemAction::Ship)?;
        let quantity = item.quantity;
        let buyer = item.user_email.clone();
        let store_id = seller_order.store_id.clone();

        self.invalidate_order_views(order_id, &buyer, [seller]).await;

        let outcome = self
            .stores
            .seller_orders
            .set_item_status(
                order_id,
                &store_id,
                product_id,
                &[ItemStatus::Processed],
                ItemStatus::Shipped,
            )
            .await?;
        first_write(outcome, product_id, ItemAction::Ship)?;

        let mirrored = self
            .mirror_write(
                "ship order item",
                order_id,
                product_id,
                WriteOutcome::is_effective,
                || {
                    self.stores.orders.set_item_status(
                        order_id,
                        product_id,
                        &[ItemStatus::Pending, ItemStatus::Processed],
                        ItemStatus::Shipped,
                    )
                },
            )
            .await;

        self.invalidate_order_views(order_id, &buyer, [seller]).await;
        mirrored?;

        counter!("order_items_shipped_total").increment(1);
        self.notify(
            &buyer,
            Template::UserProductShipped,
            [
                ("product_id", product_id.to_string()),
                ("store_id", store_id.to_string()),
            ],
        );

        self.decrement_stock(seller, &store_id, product_id, quantity)
            .await
    }

    async fn decrement_stock(
        &self,
        seller: &UserId,
        store_id: &StoreId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()> {
        let modified = self
            .call(
                "decrement_stock",
                self.services
                    .catalog
                    .decrement_stock(store_id, product_id, quantity),
            )
            .await
            .inspect_err(|e| {
                tracing::error!(%store_id, %product_id, quantity, error = %e, "stock decrement failed");
            })?;

        if modified != 1 {
            tracing::warn!(%store_id, %product_id, modified, "stock decrement matched no product");
            return Ok(());
        }

        match self
            .call(
                "get_product",
                self.services.catalog.get_product(product_id),
            )
            .await
        {
            Ok(Some(product)) if product.stock <= self.config.low_stock_threshold => {
                tracing::info!(%product_id, stock = product.stock, "stock running low");
                self.notify(
                    seller,
                    Template::SellerLessStock,
                    [("product_id", product_id.to_string())],
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(%product_id, error = %e, "stock check after shipment failed");
            }
        }
        Ok(())
    }

    /// Withdraws one `PENDING` item from both the order and the seller order.
    ///
    /// Rejected once the payment record is `SUCCESS` or either copy of the
    /// item has moved past `PENDING`. The actor's own document is written
    /// first. The other side tolerates an already-removed item.
    #[tracing::instrument(skip(self), fields(user = %actor.user(), role = actor.role(), %order_id, %product_id))]
    pub async fn cancel_order_item(
        &self,
        actor: &Actor,
        order_id: OrderId,
        product_id: &ProductId,
    ) -> Result<()> {
        let (buyer, seller, store_id, mirror_status) = match actor {
            Actor::Buyer(buyer) => {
                let order = self.owned_order(buyer, order_id).await?;
                let item = order.require_item(product_id)?;
                item.check(ItemAction::Cancel)?;
                let seller_order = self
                    .stores
                    .seller_orders
                    .get(order_id, &item.store_id)
                    .await?;
                let mirror_status = seller_order
                    .as_ref()
                    .and_then(|s| s.item(product_id))
                    .map(|i| i.order_status);
                (
                    buyer.clone(),
                    seller_order.map(|s| s.seller),
                    item.store_id.clone(),
                    mirror_status,
                )
            }
            Actor::Seller(seller) => {
                let seller_order = self.owned_seller_order(seller, order_id).await?;
                let item =
                    seller_order
                        .item(product_id)
                        .ok_or_else(|| DomainError::ItemNotFound {
                            product_id: product_id.clone(),
                        })?;
                item.check(ItemAction::Cancel)?;
                let mirror_status = self
                    .stores
                    .orders
                    .get(order_id)
                    .await?
                    .and_then(|o| o.item(product_id).map(|i| i.order_status));
                (
                    item.user_email.clone(),
                    Some(seller.clone()),
                    seller_order.store_id.clone(),
                    mirror_status,
                )
            }
        };

        // The mirror and the payment record must both still be unpaid.
        if let Some(actual) = mirror_status
            && actual != ItemStatus::Pending
        {
            return Err(DomainError::ItemTransition {
                product_id: product_id.clone(),
                action: ItemAction::Cancel,
                expected: ItemStatus::Pending,
                actual,
            }
            .into());
        }
        if let Some(payment) = self.stores.payments.get(order_id).await?
            && payment.status == PaymentStatus::Success
        {
            return Err(FulfillmentError::AlreadyPaid {
                order_id,
                product_id: product_id.clone(),
            });
        }

        self.invalidate_order_views(order_id, &buyer, seller.iter())
            .await;

        let accept_gone =
            |o: &WriteOutcome| matches!(o, WriteOutcome::Applied | WriteOutcome::Missing);
        let mirrored = match actor {
            Actor::Buyer(_) => {
                let outcome = self
                    .stores
                    .orders
                    .remove_item(order_id, product_id, ItemStatus::Pending)
                    .await?;
                first_write(outcome, product_id, ItemAction::Cancel)?;
                self.mirror_write("cancel seller item", order_id, product_id, accept_gone, || {
                    self.stores.seller_orders.remove_item(
                        order_id,
                        &store_id,
                        product_id,
                        ItemStatus::Pending,
                    )
                })
                .await
            }
            Actor::Seller(_) => {
                let outcome = self
                    .stores
                    .seller_orders
                    .remove_item(order_id, &store_id, product_id, ItemStatus::Pending)
                    .await?;
                first_write(outcome, product_id, ItemAction::Cancel)?;
                self.mirror_write("cancel order item", order_id, product_id, accept_gone, || {
                    self.stores
                        .orders
                        .remove_item(order_id, product_id, ItemStatus::Pending)
                })
                .await
            }
        };

        self.invalidate_order_views(order_id, &buyer, seller.iter())
            .await;
        mirrored?;

        counter!("order_items_cancelled_total", "role" => actor.role()).increment(1);
        tracing::info!("order item cancelled");
        Ok(())
    }
}
