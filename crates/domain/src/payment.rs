//! Payment record and payment status mirrors.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::Money;

/// Status of the authoritative payment record and of the buyer-order mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order-level payment flag carried on each seller order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SellerPaymentStatus {
    #[default]
    Unpaid,
    Success,
}

impl SellerPaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, SellerPaymentStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SellerPaymentStatus::Unpaid => "UNPAID",
            SellerPaymentStatus::Success => "SUCCESS",
        }
    }
}

impl std::fmt::Display for SellerPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authoritative payment record, one per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub order_id: OrderId,
    pub buyer: UserId,
    pub amount: Money,
    pub payment_method: Option<String>,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,

    /// Hosted checkout page returned by the gateway.
    pub redirect_url: String,

    /// Set once the buyer has been told the payment went through.
    #[serde(default)]
    pub buyer_notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A fresh pending payment for an order.
    pub fn pending(
        order_id: OrderId,
        buyer: UserId,
        amount: Money,
        redirect_url: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            buyer,
            amount,
            payment_method: None,
            status: PaymentStatus::Pending,
            transaction_id: None,
            redirect_url: redirect_url.into(),
            buyer_notified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields written when a payment is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub payment_method: String,
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_serialize_uppercase() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Success).unwrap(),
            "\"SUCCESS\""
        );
        assert_eq!(
            serde_json::to_string(&SellerPaymentStatus::Unpaid).unwrap(),
            "\"UNPAID\""
        );
    }

    #[test]
    fn test_pending_payment_defaults() {
        let p = Payment::pending(
            OrderId::new(),
            UserId::new("buyer@example.com"),
            Money::from_cents(2500),
            "https://pay.example/redirect",
            Utc::now(),
        );
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.transaction_id.is_none());
        assert!(!p.status.is_paid());
        assert!(!p.buyer_notified);
    }

    #[test]
    fn test_stored_payment_without_notified_flag_decodes() {
        let p = Payment::pending(
            OrderId::new(),
            UserId::new("buyer@example.com"),
            Money::from_cents(2500),
            "https://pay.example/redirect",
            Utc::now(),
        );
        let mut doc = serde_json::to_value(&p).unwrap();
        doc.as_object_mut().unwrap().remove("buyer_notified");
        let decoded: Payment = serde_json::from_value(doc).unwrap();
        assert!(!decoded.buyer_notified);
    }
}
