use chrono::Utc;
use common::{OrderId, UserId};
use domain::{ItemStatus, Payment, PaymentConfirmation};
use metrics::counter;
use store::{StoreError, WriteOutcome};

use super::OrderOrchestrator;
use crate::error::{FulfillmentError, Result};
use crate::services::Template;

impl OrderOrchestrator {
    /// Opens a hosted payment session for the buyer's order.
    ///
    /// Idempotent: an order that already has a payment record returns the
    /// existing redirect URL without contacting the gateway.
    #[tracing::instrument(skip(self), fields(%buyer, %order_id))]
    pub async fn initialize_payment(&self, buyer: &UserId, order_id: OrderId) -> Result<String> {
        let order = self.owned_order(buyer, order_id).await?;

        if let Some(existing) = self.stores.payments.get(order_id).await? {
            return Ok(existing.redirect_url);
        }

        let redirect_url = self
            .call(
                "create_session",
                self.services
                    .gateway
                    .create_session(order_id, order.total_price),
            )
            .await?;

        let payment = Payment::pending(
            order_id,
            buyer.clone(),
            order.total_price,
            redirect_url.clone(),
            Utc::now(),
        );
        match self.stores.payments.insert(&payment).await {
            Ok(()) => {
                tracing::info!(amount = %order.total_price, "payment session created");
                Ok(redirect_url)
            }
            Err(StoreError::Duplicate { .. }) => {
                let existing = self
                    .stores
                    .payments
                    .get(order_id)
                    .await?
                    .ok_or(FulfillmentError::PaymentNotFound(order_id))?;
                Ok(existing.redirect_url)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Re-queries the gateway and, if the order is paid, confirms it
    /// everywhere it is mirrored.
    ///
    /// Write order: payment record, order payment mirror, every seller order
    /// (payment flag and `PENDING` items), then the order's `PENDING` items.
    /// Each write is guarded, so redelivered or reordered webhooks converge
    /// on the same state and never move an item backwards. The buyer is
    /// notified once the cascade has completed, by whichever call first
    /// flips the payment's `buyer_notified` flag.
    #[tracing::instrument(skip(self), fields(%order_id))]
    pub async fn reconcile_payment(&self, order_id: OrderId) -> Result<bool> {
        let transaction = self
            .call(
                "query_status",
                self.services.gateway.query_status(order_id),
            )
            .await?;

        if transaction.status.needs_review() {
            tracing::info!(
                transaction_id = %transaction.transaction_id,
                "payment captured, awaiting fraud review"
            );
            counter!("payment_reconciliations_total", "outcome" => "review").increment(1);
            return Ok(false);
        }
        if !transaction.status.is_paid() {
            tracing::debug!(status = transaction.status.as_str(), "payment not settled");
            counter!("payment_reconciliations_total", "outcome" => "unpaid").increment(1);
            return Ok(false);
        }

        let payment = self
            .stores
            .payments
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::PaymentNotFound(order_id))?;
        let order = self
            .stores
            .orders
            .get(order_id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(order_id))?;
        let seller_orders = self.stores.seller_orders.list_by_order(order_id).await?;
        let confirmation = PaymentConfirmation {
            payment_method: transaction.payment_method,
            transaction_id: transaction.transaction_id,
        };

        self.invalidate_order_views(order_id, &order.buyer, seller_orders.iter().map(|s| &s.seller))
            .await;

        let payment_outcome = self.stores.payments.confirm(order_id, &confirmation).await?;
        if payment_outcome == WriteOutcome::Missing {
            return Err(FulfillmentError::PaymentNotFound(order_id));
        }

        let result = self
            .cascade_payment(order_id, &confirmation, &seller_orders)
            .await;

        self.invalidate_order_views(order_id, &order.buyer, seller_orders.iter().map(|s| &s.seller))
            .await;
        result?;

        if self.announce_payment(&payment).await? {
            counter!("payment_reconciliations_total", "outcome" => "paid").increment(1);
            tracing::info!(amount = %payment.amount, "payment confirmed");
        } else {
            counter!("payment_reconciliations_total", "outcome" => "duplicate").increment(1);
        }

        Ok(true)
    }

    /// Sends `USER_PAYMENT` unless the buyer has already been told.
    ///
    /// Only call once the payment has been mirrored everywhere. Returns
    /// whether this call sent the notification.
    pub(super) async fn announce_payment(&self, payment: &Payment) -> Result<bool> {
        let order_id = payment.order_id;
        match self.stores.payments.mark_buyer_notified(order_id).await? {
            WriteOutcome::Applied => {
                self.notify(
                    &payment.buyer,
                    Template::UserPayment,
                    [
                        ("order_id", order_id.to_string()),
                        ("amount", payment.amount.to_decimal_string()),
                    ],
                );
                Ok(true)
            }
            WriteOutcome::Missing => Err(FulfillmentError::PaymentNotFound(order_id)),
            _ => Ok(false),
        }
    }

    /// Mirrors a confirmed payment onto the order and its seller orders.
    async fn cascade_payment(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
        seller_orders: &[domain::SellerOrder],
    ) -> Result<()> {
        let outcome = self
            .stores
            .orders
            .confirm_payment(order_id, confirmation)
            .await
            .map_err(|e| self.payment_cascade_failed("order payment mirror", order_id, e))?;
        if outcome == WriteOutcome::Missing {
            return Err(FulfillmentError::OrderNotFound(order_id));
        }

        for seller_order in seller_orders {
            self.stores
                .seller_orders
                .confirm_payment(order_id, &seller_order.store_id)
                .await
                .map_err(|e| self.payment_cascade_failed("seller order payment", order_id, e))?;
        }

        self.stores
            .orders
            .promote_items(order_id, ItemStatus::Pending, ItemStatus::Processed)
            .await
            .map_err(|e| self.payment_cascade_failed("order items", order_id, e))?;

        Ok(())
    }

    fn payment_cascade_failed(
        &self,
        step: &'static str,
        order_id: OrderId,
        error: StoreError,
    ) -> FulfillmentError {
        tracing::error!(
            step,
            %order_id,
            error = %error,
            "payment recorded but mirror update failed, redelivery or repair will converge"
        );
        counter!("mirror_inconsistencies_total", "step" => step).increment(1);
        FulfillmentError::PartialFanOut {
            step: step.to_string(),
            reason: error.to_string(),
        }
    }
}
