//! Review collaborator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::ProductId;
use domain::Review;
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};

/// Read access to product reviews.
#[async_trait]
pub trait ReviewService: Send + Sync {
    async fn list_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>>;
}

/// In-memory review service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReviewService {
    reviews: Arc<RwLock<HashMap<ProductId, Vec<Review>>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryReviewService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_review(&self, review: Review) {
        self.reviews
            .write()
            .await
            .entry(review.product_id.clone())
            .or_default()
            .push(review);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReviewService for InMemoryReviewService {
    async fn list_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(FulfillmentError::external(
                "list_reviews",
                "review store unreachable",
            ));
        }
        Ok(self
            .reviews
            .read()
            .await
            .get(product_id)
            .cloned()
            .unwrap_or_default())
    }
}
