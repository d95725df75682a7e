//! Payment gateway adapter contract.
//!
//! The gateway owns the transaction state. The orchestrator only creates
//! hosted sessions and re-queries status when a callback arrives; it never
//! trusts the status carried by the callback itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::OrderId;
use domain::Money;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};

/// Fraud screening verdict attached to a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
}

/// Transaction status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Capture { fraud: FraudStatus },
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
    Refund,
    Other(String),
}

impl GatewayStatus {
    /// Returns true if money has been received and cleared.
    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            GatewayStatus::Capture {
                fraud: FraudStatus::Accept
            } | GatewayStatus::Settlement
        )
    }

    /// Returns true if the capture is parked for manual fraud review.
    pub fn needs_review(&self) -> bool {
        matches!(
            self,
            GatewayStatus::Capture {
                fraud: FraudStatus::Challenge
            }
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayStatus::Capture { .. } => "capture",
            GatewayStatus::Settlement => "settlement",
            GatewayStatus::Pending => "pending",
            GatewayStatus::Deny => "deny",
            GatewayStatus::Cancel => "cancel",
            GatewayStatus::Expire => "expire",
            GatewayStatus::Refund => "refund",
            GatewayStatus::Other(other) => other,
        }
    }
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub status: GatewayStatus,
    pub transaction_id: String,
    pub payment_method: String,
}

/// Hosted payment sessions and authoritative status queries.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted payment session and returns its redirect URL.
    async fn create_session(&self, order_id: OrderId, amount: Money) -> Result<String>;

    /// Asks the gateway for the current status of the order's transaction.
    async fn query_status(&self, order_id: OrderId) -> Result<TransactionStatus>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<OrderId, Money>,
    statuses: HashMap<OrderId, TransactionStatus>,
    delay: Option<Duration>,
}

/// In-memory gateway for testing.
///
/// Orders without an explicit status report `Pending`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status the gateway will report for `order_id`.
    pub async fn set_status(&self, order_id: OrderId, status: GatewayStatus) {
        let transaction_id = format!("tx-{order_id}");
        self.state.write().await.statuses.insert(
            order_id,
            TransactionStatus {
                status,
                transaction_id,
                payment_method: "bank_transfer".into(),
            },
        );
    }

    /// Delays every call, to exercise timeouts.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().await.delay = delay;
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of sessions created so far.
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        let delay = self.state.read().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FulfillmentError::external(operation, "gateway unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_session(&self, order_id: OrderId, amount: Money) -> Result<String> {
        self.enter("create_session").await?;
        self.state.write().await.sessions.insert(order_id, amount);
        Ok(format!("https://pay.example.com/session/{order_id}"))
    }

    async fn query_status(&self, order_id: OrderId) -> Result<TransactionStatus> {
        self.enter("query_status").await?;
        let state = self.state.read().await;
        Ok(state
            .statuses
            .get(&order_id)
            .cloned()
            .unwrap_or_else(|| TransactionStatus {
                status: GatewayStatus::Pending,
                transaction_id: String::new(),
                payment_method: String::new(),
            }))
    }
}
