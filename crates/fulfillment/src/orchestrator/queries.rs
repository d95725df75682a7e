use cache::CacheKey;
use common::{OrderId, UserId};
use domain::{Order, SellerOrder};

use super::OrderOrchestrator;
use crate::error::{FulfillmentError, Result};

impl OrderOrchestrator {
    /// One of the buyer's orders, through the cache.
    #[tracing::instrument(skip(self), fields(%buyer, %order_id))]
    pub async fn get_order(&self, buyer: &UserId, order_id: OrderId) -> Result<Order> {
        let key = CacheKey::buyer_order(buyer, order_id);
        self.cache
            .get_or_load(&key, self.config.order_cache_ttl, || {
                self.owned_order(buyer, order_id)
            })
            .await
    }

    /// Every order of the buyer, newest first, through the cache.
    #[tracing::instrument(skip(self), fields(%buyer))]
    pub async fn list_orders(&self, buyer: &UserId) -> Result<Vec<Order>> {
        let key = CacheKey::buyer_orders(buyer);
        self.cache
            .get_or_load(&key, self.config.order_cache_ttl, || async {
                Ok::<_, FulfillmentError>(self.stores.orders.list_by_buyer(buyer).await?)
            })
            .await
    }

    /// The seller's share of one order, through the cache.
    #[tracing::instrument(skip(self), fields(%seller, %order_id))]
    pub async fn get_seller_order(&self, seller: &UserId, order_id: OrderId) -> Result<SellerOrder> {
        let key = CacheKey::seller_order(seller, order_id);
        self.cache
            .get_or_load(&key, self.config.order_cache_ttl, || {
                self.owned_seller_order(seller, order_id)
            })
            .await
    }

    /// Every seller order of the seller, newest first, through the cache.
    #[tracing::instrument(skip(self), fields(%seller))]
    pub async fn list_seller_orders(&self, seller: &UserId) -> Result<Vec<SellerOrder>> {
        let key = CacheKey::seller_orders(seller);
        self.cache
            .get_or_load(&key, self.config.order_cache_ttl, || async {
                Ok::<_, FulfillmentError>(self.stores.seller_orders.list_by_seller(seller).await?)
            })
            .await
    }
}
