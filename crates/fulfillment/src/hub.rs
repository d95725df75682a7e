//! Live-update hub for connected users.
//!
//! Each subscribed user owns one bounded channel. Delivery never waits: a
//! missing subscriber, a closed channel or a full channel drops the message.

use std::collections::HashMap;
use std::sync::Arc;

use common::UserId;
use tokio::sync::{RwLock, mpsc};

use crate::services::Notification;

/// What happened to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Dropped,
}

/// Registry of live subscribers keyed by user.
#[derive(Clone)]
pub struct NotificationHub {
    subscribers: Arc<RwLock<HashMap<UserId, mpsc::Sender<Notification>>>>,
    capacity: usize,
}

impl NotificationHub {
    /// Creates a hub whose per-user channels hold `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Opens a channel for `user`, replacing any previous subscription.
    pub async fn subscribe(&self, user: &UserId) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel(self.capacity);
        if self
            .subscribers
            .write()
            .await
            .insert(user.clone(), tx)
            .is_some()
        {
            tracing::debug!(%user, "replaced live subscription");
        }
        rx
    }

    /// Removes the subscription. Returns false if there was none.
    pub async fn unsubscribe(&self, user: &UserId) -> bool {
        self.subscribers.write().await.remove(user).is_some()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Hands `message` to the user's channel without waiting.
    pub async fn deliver(&self, user: &UserId, message: Notification) -> DeliveryOutcome {
        let sender = self.subscribers.read().await.get(user).cloned();
        let Some(sender) = sender else {
            return DeliveryOutcome::Dropped;
        };

        match sender.try_send(message) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(%user, "live channel full, dropping message");
                DeliveryOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                let mut subscribers = self.subscribers.write().await;
                if subscribers.get(user).is_some_and(|tx| tx.is_closed()) {
                    subscribers.remove(user);
                }
                DeliveryOutcome::Dropped
            }
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(32)
    }
}
