//! Cart collaborator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::UserId;
use domain::CartItem;
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};

/// Read access to buyers' carts.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Returns true if the buyer has a cart document at all.
    async fn has_cart(&self, buyer: &UserId) -> Result<bool>;

    /// Returns every line of the buyer's cart, selected or not.
    async fn get_cart(&self, buyer: &UserId) -> Result<Vec<CartItem>>;
}

/// In-memory cart service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    carts: Arc<RwLock<HashMap<UserId, Vec<CartItem>>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryCartService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the buyer's cart.
    pub async fn put_cart(&self, buyer: &UserId, items: Vec<CartItem>) {
        self.carts.write().await.insert(buyer.clone(), items);
    }

    /// Configures every call to fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FulfillmentError::external(operation, "cart store unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn has_cart(&self, buyer: &UserId) -> Result<bool> {
        self.check("has_cart")?;
        Ok(self.carts.read().await.contains_key(buyer))
    }

    async fn get_cart(&self, buyer: &UserId) -> Result<Vec<CartItem>> {
        self.check("get_cart")?;
        Ok(self
            .carts
            .read()
            .await
            .get(buyer)
            .cloned()
            .unwrap_or_default())
    }
}
