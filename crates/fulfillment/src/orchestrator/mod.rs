//! The order orchestrator.
//!
//! Owns every business rule of the fulfillment workflow. Stores, cache and
//! collaborators are plain primitives it drives; all coordination happens
//! through guarded store writes, never in-process locks.
//!
//! Operations are grouped by concern:
//! - [`create`]: checkout and seller fan-out with compensation
//! - [`payment`]: payment sessions and webhook reconciliation
//! - [`transitions`]: finish, ship and cancel of single items
//! - [`queries`]: cache-aside reads of buyer and seller views
//! - [`reports`]: sales report recompute and reads
//! - [`repair`]: convergence of mirrored documents

mod create;
mod payment;
mod queries;
mod repair;
mod reports;
mod transitions;

use std::future::Future;
use std::sync::Arc;

use cache::{Cache, CacheAside, CacheKey};
use common::{OrderId, ProductId, UserId};
use domain::SellerOrder;
use metrics::counter;
use store::{OrderStore, PaymentStore, SalesReportStore, SellerOrderStore, WriteOutcome};

use crate::config::OrchestratorConfig;
use crate::error::{FulfillmentError, Result};
use crate::outbox::Outbox;
use crate::services::{
    CartService, CatalogService, IdentityService, Notification, PaymentGateway, ReviewService,
    Template,
};

pub use repair::{RepairAction, RepairKind, RepairReport, RepairSummary};
pub use transitions::Actor;

/// The four document stores the workflow writes.
#[derive(Clone)]
pub struct Stores {
    pub orders: Arc<dyn OrderStore>,
    pub seller_orders: Arc<dyn SellerOrderStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub sales_reports: Arc<dyn SalesReportStore>,
}

/// External collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub cart: Arc<dyn CartService>,
    pub catalog: Arc<dyn CatalogService>,
    pub reviews: Arc<dyn ReviewService>,
    pub identity: Arc<dyn IdentityService>,
    pub gateway: Arc<dyn PaymentGateway>,
}

/// Drives order creation, payment reconciliation and item transitions.
pub struct OrderOrchestrator {
    stores: Stores,
    services: Collaborators,
    cache: CacheAside,
    outbox: Outbox,
    config: OrchestratorConfig,
}

impl OrderOrchestrator {
    pub fn new(
        stores: Stores,
        services: Collaborators,
        cache: Arc<dyn Cache>,
        outbox: Outbox,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            stores,
            services,
            cache: CacheAside::new(cache),
            outbox,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Runs a collaborator call under the configured deadline.
    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.external_call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, "collaborator call timed out");
                Err(FulfillmentError::Timeout { operation })
            }
        }
    }

    /// Loads an order directly from the store and checks ownership.
    ///
    /// Another buyer's order is reported as missing.
    async fn owned_order(&self, buyer: &UserId, order_id: OrderId) -> Result<domain::Order> {
        self.stores
            .orders
            .get(order_id)
            .await?
            .filter(|o| o.is_owned_by(buyer))
            .ok_or(FulfillmentError::OrderNotFound(order_id))
    }

    /// Loads the seller's share of an order directly from the store.
    async fn owned_seller_order(&self, seller: &UserId, order_id: OrderId) -> Result<SellerOrder> {
        self.stores
            .seller_orders
            .list_by_order(order_id)
            .await?
            .into_iter()
            .find(|o| o.is_owned_by(seller))
            .ok_or(FulfillmentError::SellerOrderNotFound(order_id))
    }

    fn notify<'a>(
        &self,
        recipient: &UserId,
        template: Template,
        data: impl IntoIterator<Item = (&'a str, String)>,
    ) {
        self.outbox
            .enqueue(Notification::new(recipient.clone(), template, data));
    }

    /// Deletes the cached views of every party to an order.
    async fn invalidate_order_views(
        &self,
        order_id: OrderId,
        buyer: &UserId,
        sellers: impl IntoIterator<Item = &UserId>,
    ) {
        let mut keys = vec![
            CacheKey::buyer_order(buyer, order_id),
            CacheKey::buyer_orders(buyer),
        ];
        for seller in sellers {
            keys.push(CacheKey::seller_order(seller, order_id));
            keys.push(CacheKey::seller_orders(seller));
        }
        keys.dedup();
        self.cache.invalidate(&keys).await;
    }

    /// Applies the second half of a mirrored write, retrying once.
    ///
    /// `accept` decides which outcomes count as converged. When both
    /// attempts fail the inconsistency is logged and counted, and the caller
    /// receives `PartialFanOut`; the repair sweep converges it later.
    async fn mirror_write<F, Fut>(
        &self,
        step: &'static str,
        order_id: OrderId,
        product_id: &ProductId,
        accept: impl Fn(&WriteOutcome) -> bool,
        write: F,
    ) -> Result<()>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = store::Result<WriteOutcome>>,
    {
        let mut reason = String::new();
        for attempt in 1..=2u8 {
            match write().await {
                Ok(outcome) if accept(&outcome) => return Ok(()),
                Ok(outcome) => reason = format!("unexpected outcome {outcome:?}"),
                Err(e) => reason = e.to_string(),
            }
            tracing::warn!(step, %order_id, %product_id, attempt, %reason, "mirror write failed");
        }

        tracing::error!(
            step,
            %order_id,
            %product_id,
            %reason,
            "order and seller order diverged, awaiting repair"
        );
        counter!("mirror_inconsistencies_total", "step" => step).increment(1);
        Err(FulfillmentError::PartialFanOut {
            step: step.to_string(),
            reason,
        })
    }
}
