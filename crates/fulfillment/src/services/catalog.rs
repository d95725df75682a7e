//! Catalog collaborator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{ProductId, StoreId};
use domain::Money;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};

/// The catalog's view of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
    pub store_id: StoreId,
    pub images: Vec<String>,
}

/// Product lookups and stock mutation.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Decrements stock of a product owned by `store_id`.
    ///
    /// Returns the number of products modified: 0 when the product does not
    /// exist or belongs to another store.
    async fn decrement_stock(
        &self,
        store_id: &StoreId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<u64>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    state: Arc<RwLock<InMemoryCatalogState>>,
    fail_on_decrement: Arc<AtomicBool>,
}

impl InMemoryCatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: Product) {
        self.state
            .write()
            .await
            .products
            .insert(product.product_id.clone(), product);
    }

    /// Returns the current stock, or `None` for an unknown product.
    pub async fn stock(&self, product_id: &ProductId) -> Option<i64> {
        self.state
            .read()
            .await
            .products
            .get(product_id)
            .map(|p| p.stock)
    }

    /// Configures stock decrements to fail.
    pub fn set_fail_on_decrement(&self, fail: bool) {
        self.fail_on_decrement.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(product_id).cloned())
    }

    async fn decrement_stock(
        &self,
        store_id: &StoreId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<u64> {
        if self.fail_on_decrement.load(Ordering::SeqCst) {
            return Err(FulfillmentError::external(
                "decrement_stock",
                "catalog unreachable",
            ));
        }
        let mut state = self.state.write().await;
        match state.products.get_mut(product_id) {
            Some(product) if &product.store_id == store_id => {
                product.stock -= i64::from(quantity);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
