//! Notification sink contract.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};
use crate::hub::NotificationHub;

/// Notification templates the workflow emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Template {
    /// Buyer: order placed.
    UserOrder,
    /// Seller: order placed.
    SellerOrder,
    /// Buyer: payment received.
    UserPayment,
    /// Buyer: item shipped.
    UserProductShipped,
    /// Seller: stock is running low.
    SellerLessStock,
    /// Seller: buyer confirmed receipt.
    SellerFinishOrder,
}

impl Template {
    pub fn code(&self) -> &'static str {
        match self {
            Template::UserOrder => "USER_ORDER",
            Template::SellerOrder => "SELLER_ORDER",
            Template::UserPayment => "USER_PAYMENT",
            Template::UserProductShipped => "USER_PRODUCT_SHIPPED",
            Template::SellerLessStock => "SELLER_LESS_STOCK",
            Template::SellerFinishOrder => "SELLER_FINISH_ORDER",
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub template: Template,
    pub data: BTreeMap<String, String>,
}

impl Notification {
    pub fn new<'a>(
        recipient: UserId,
        template: Template,
        data: impl IntoIterator<Item = (&'a str, String)>,
    ) -> Self {
        Self {
            recipient,
            template,
            data: data
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Delivers notifications. Rendering the template body is the sink's concern.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Records every notification and forwards it to an optional live hub.
#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    sent: Arc<RwLock<Vec<Notification>>>,
    hub: Option<NotificationHub>,
    fail: Arc<AtomicBool>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards every recorded notification to `hub`.
    pub fn with_hub(hub: NotificationHub) -> Self {
        Self {
            hub: Some(hub),
            ..Self::default()
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    /// Notifications of one template sent to one recipient.
    pub async fn sent_to(&self, recipient: &UserId, template: Template) -> Vec<Notification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| &n.recipient == recipient && n.template == template)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FulfillmentError::external(
                "notify",
                "notification store unreachable",
            ));
        }
        self.sent.write().await.push(notification.clone());
        if let Some(hub) = &self.hub {
            hub.deliver(&notification.recipient, notification.clone())
                .await;
        }
        Ok(())
    }
}
