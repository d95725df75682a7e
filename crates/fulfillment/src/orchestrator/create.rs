use std::collections::BTreeMap;

use cache::CacheKey;
use chrono::Utc;
use common::{OrderId, UserId};
use domain::{DomainError, Order, SellerOrder, checkout, fan_out};
use metrics::counter;

use super::OrderOrchestrator;
use crate::compensation::{CompensationLog, CompletedWrite};
use crate::error::{FulfillmentError, Result};
use crate::services::Template;

impl OrderOrchestrator {
    /// Turns the buyer's selected cart lines into an order and one seller
    /// order per store touched.
    ///
    /// Every seller is resolved before the first write, so lookup failures
    /// leave nothing behind. If a write fails after others succeeded, the
    /// completed writes are undone in reverse and `PartialFanOut` is
    /// returned.
    #[tracing::instrument(skip(self), fields(%buyer))]
    pub async fn create_order(&self, buyer: &UserId) -> Result<OrderId> {
        let start = std::time::Instant::now();
        match self.try_create_order(buyer).await {
            Ok(order_id) => {
                counter!("orders_created_total").increment(1);
                metrics::histogram!("order_create_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                tracing::info!(%order_id, "order created");
                Ok(order_id)
            }
            Err(e) => {
                counter!("order_create_failures_total", "kind" => e.kind().as_str())
                    .increment(1);
                tracing::warn!(error = %e, "order creation failed");
                Err(e)
            }
        }
    }

    async fn try_create_order(&self, buyer: &UserId) -> Result<OrderId> {
        self.cache.invalidate(&[CacheKey::buyer_orders(buyer)]).await;

        let profile = self
            .call("find_buyer", self.services.identity.find_buyer(buyer))
            .await?
            .ok_or_else(|| FulfillmentError::BuyerNotFound(buyer.clone()))?;
        let Some(address) = profile.address else {
            return Err(DomainError::MissingShippingAddress.into());
        };

        if !self
            .call("has_cart", self.services.cart.has_cart(buyer))
            .await?
        {
            return Err(DomainError::EmptyCart.into());
        }
        let cart = self
            .call("get_cart", self.services.cart.get_cart(buyer))
            .await?;

        let order = checkout(OrderId::new(), buyer.clone(), Some(address), &cart, Utc::now())?;

        let mut sellers = BTreeMap::new();
        for store_id in order.store_ids() {
            let seller = self
                .call(
                    "find_seller_by_store",
                    self.services.identity.find_seller_by_store(&store_id),
                )
                .await?
                .ok_or_else(|| FulfillmentError::SellerNotFound(store_id.clone()))?;
            sellers.insert(store_id, seller.user);
        }
        let seller_orders = fan_out(&order, &sellers)?;

        self.persist_checkout(&order, &seller_orders).await?;

        self.invalidate_order_views(
            order.order_id,
            buyer,
            seller_orders.iter().map(|s| &s.seller),
        )
        .await;

        let order_id = order.order_id.to_string();
        for seller_order in &seller_orders {
            self.notify(buyer, Template::UserOrder, [("order_id", order_id.clone())]);
            self.notify(
                &seller_order.seller,
                Template::SellerOrder,
                [("order_id", order_id.clone())],
            );
        }

        Ok(order.order_id)
    }

    async fn persist_checkout(&self, order: &Order, seller_orders: &[SellerOrder]) -> Result<()> {
        self.stores.orders.insert(order).await?;

        let mut log = CompensationLog::default();
        log.record(CompletedWrite::Order(order.order_id));

        for seller_order in seller_orders {
            if let Err(e) = self.stores.seller_orders.insert(seller_order).await {
                tracing::error!(
                    order_id = %order.order_id,
                    store_id = %seller_order.store_id,
                    error = %e,
                    "seller order write failed, compensating"
                );
                let failures = log
                    .compensate(
                        self.stores.orders.as_ref(),
                        self.stores.seller_orders.as_ref(),
                    )
                    .await;
                if failures > 0 {
                    tracing::error!(
                        order_id = %order.order_id,
                        failures,
                        "compensation incomplete, documents left behind"
                    );
                }
                return Err(FulfillmentError::PartialFanOut {
                    step: format!("insert seller order for store {}", seller_order.store_id),
                    reason: e.to_string(),
                });
            }
            log.record(CompletedWrite::SellerOrder(
                order.order_id,
                seller_order.store_id.clone(),
            ));
        }

        Ok(())
    }
}
