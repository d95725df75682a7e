use std::collections::BTreeMap;

use cache::CacheKey;
use common::{StoreId, UserId};
use domain::{ProductFacts, SalesReport, SalesTally, average_rating};
use store::WriteOutcome;

use super::OrderOrchestrator;
use crate::error::{FulfillmentError, Result};

impl OrderOrchestrator {
    /// Rebuilds a store's sales report from scratch.
    ///
    /// Tallies finished items of paid seller orders, then looks up each sold
    /// product's reviews and current stock. The products list is replaced
    /// wholesale. With no intervening writes the result is identical.
    #[tracing::instrument(skip(self), fields(%store_id, %seller))]
    pub async fn recompute_sales_report(
        &self,
        store_id: &StoreId,
        seller: &UserId,
    ) -> Result<SalesReport> {
        let start = std::time::Instant::now();

        let seller_orders = self.stores.seller_orders.list_by_seller(seller).await?;
        let tally = SalesTally::from_seller_orders(store_id, &seller_orders);

        let mut facts = BTreeMap::new();
        for product_id in tally.product_ids() {
            let reviews = self
                .call(
                    "list_reviews",
                    self.services.reviews.list_reviews(product_id),
                )
                .await?;
            let stock = self
                .call(
                    "get_product",
                    self.services.catalog.get_product(product_id),
                )
                .await?
                .map(|p| p.stock)
                .unwrap_or_default();
            facts.insert(
                product_id.clone(),
                ProductFacts {
                    average_rating: average_rating(&reviews),
                    stock,
                },
            );
        }

        let report = tally.into_report(store_id.clone(), seller.clone(), &facts);
        if self.stores.sales_reports.replace(&report).await? == WriteOutcome::Missing {
            return Err(FulfillmentError::SalesReportNotFound(store_id.clone()));
        }

        self.cache
            .invalidate(&[CacheKey::sales_report(store_id)])
            .await;

        metrics::histogram!("sales_report_recompute_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(
            products = report.products.len(),
            total_sold = report.total_sold,
            "sales report recomputed"
        );
        Ok(report)
    }

    /// The store's sales report, through the cache.
    ///
    /// A report owned by another seller is reported as missing.
    #[tracing::instrument(skip(self), fields(%seller, %store_id))]
    pub async fn get_sales_report(&self, seller: &UserId, store_id: &StoreId) -> Result<SalesReport> {
        let key = CacheKey::sales_report(store_id);
        let report: SalesReport = self
            .cache
            .get_or_load(&key, self.config.sales_report_cache_ttl, || async {
                self.stores
                    .sales_reports
                    .get(store_id)
                    .await?
                    .ok_or_else(|| FulfillmentError::SalesReportNotFound(store_id.clone()))
            })
            .await?;

        if &report.seller != seller {
            return Err(FulfillmentError::SalesReportNotFound(store_id.clone()));
        }
        Ok(report)
    }
}
