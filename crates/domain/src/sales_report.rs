//! Per-store sales aggregation.
//!
//! The report is always recomputed from scratch: reviews and cancellations
//! can change past figures, so there is no incremental counter to maintain.

use std::collections::BTreeMap;

use common::{ProductId, StoreId, UserId};
use serde::{Deserialize, Serialize};

use crate::{ItemStatus, Money, SellerOrder};

/// Sales figures for one product in a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub sold: u64,
    pub income: Money,
    pub average_rating: f64,
    pub stock: i64,
}

/// Sales report for one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub store_id: StoreId,
    pub seller: UserId,
    pub total_sold: u64,
    pub total_income: Money,
    pub products: Vec<ProductSales>,
}

impl SalesReport {
    /// A zero-valued report, as created alongside a new store.
    pub fn empty(store_id: StoreId, seller: UserId) -> Self {
        Self {
            store_id,
            seller,
            total_sold: 0,
            total_income: Money::zero(),
            products: Vec::new(),
        }
    }
}

/// Per-product data that does not come from seller orders.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProductFacts {
    pub average_rating: f64,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProductTally {
    product_name: String,
    sold: u64,
    income: Money,
}

/// Quantities and income of finished, paid items for one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesTally {
    products: BTreeMap<ProductId, ProductTally>,
}

impl SalesTally {
    /// Tallies the finished items of paid seller orders belonging to `store_id`.
    pub fn from_seller_orders<'a>(
        store_id: &StoreId,
        orders: impl IntoIterator<Item = &'a SellerOrder>,
    ) -> Self {
        let mut products: BTreeMap<ProductId, ProductTally> = BTreeMap::new();

        for order in orders {
            if &order.store_id != store_id || !order.payment_status.is_paid() {
                continue;
            }
            for item in order
                .items
                .iter()
                .filter(|i| i.order_status == ItemStatus::Finished)
            {
                let entry = products
                    .entry(item.product_id.clone())
                    .or_insert_with(|| ProductTally {
                        product_name: item.product_name.clone(),
                        sold: 0,
                        income: Money::zero(),
                    });
                entry.sold += item.quantity as u64;
                entry.income += item.total_price();
            }
        }

        Self { products }
    }

    /// Products with at least one sale, in id order.
    pub fn product_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.products.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Builds the report; products missing from `facts` get zero rating and stock.
    pub fn into_report(
        self,
        store_id: StoreId,
        seller: UserId,
        facts: &BTreeMap<ProductId, ProductFacts>,
    ) -> SalesReport {
        let mut total_sold = 0;
        let mut total_income = Money::zero();
        let mut products = Vec::with_capacity(self.products.len());

        for (product_id, tally) in self.products {
            let extra = facts.get(&product_id).copied().unwrap_or_default();
            total_sold += tally.sold;
            total_income += tally.income;
            products.push(ProductSales {
                product_id,
                product_name: tally.product_name,
                sold: tally.sold,
                income: tally.income,
                average_rating: extra.average_rating,
                stock: extra.stock,
            });
        }

        SalesReport {
            store_id,
            seller,
            total_sold,
            total_income,
            products,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::OrderId;

    use super::*;
    use crate::{SellerOrderItem, SellerPaymentStatus, ShippingAddress};

    fn seller_item(product: &str, status: ItemStatus, qty: u32, cents: i64) -> SellerOrderItem {
        SellerOrderItem {
            product_id: ProductId::new(product),
            product_name: format!("name-{product}"),
            product_image: vec![],
            order_status: status,
            quantity: qty,
            price: Money::from_cents(cents),
            user_email: UserId::new("b@example.com"),
            address_shipping: ShippingAddress::default(),
        }
    }

    fn seller_order(
        store: &str,
        paid: SellerPaymentStatus,
        items: Vec<SellerOrderItem>,
    ) -> SellerOrder {
        let now = Utc::now();
        SellerOrder {
            order_id: OrderId::new(),
            store_id: StoreId::new(store),
            seller: UserId::new("s@example.com"),
            order_date: now,
            updated_at: now,
            total_price: items.iter().map(SellerOrderItem::total_price).sum(),
            payment_status: paid,
            items,
        }
    }

    #[test]
    fn test_only_finished_paid_items_count() {
        let orders = vec![
            seller_order(
                "a",
                SellerPaymentStatus::Success,
                vec![
                    seller_item("p1", ItemStatus::Finished, 2, 1000),
                    seller_item("p2", ItemStatus::Shipped, 1, 500),
                ],
            ),
            seller_order(
                "a",
                SellerPaymentStatus::Unpaid,
                vec![seller_item("p1", ItemStatus::Finished, 7, 1000)],
            ),
            seller_order(
                "b",
                SellerPaymentStatus::Success,
                vec![seller_item("p1", ItemStatus::Finished, 9, 1000)],
            ),
            seller_order(
                "a",
                SellerPaymentStatus::Success,
                vec![seller_item("p1", ItemStatus::Finished, 1, 1000)],
            ),
        ];

        let store = StoreId::new("a");
        let tally = SalesTally::from_seller_orders(&store, &orders);
        let ids: Vec<_> = tally.product_ids().cloned().collect();
        assert_eq!(ids, vec![ProductId::new("p1")]);

        let mut facts = BTreeMap::new();
        facts.insert(
            ProductId::new("p1"),
            ProductFacts {
                average_rating: 4.5,
                stock: 12,
            },
        );
        let report = tally.into_report(store, UserId::new("s@example.com"), &facts);
        assert_eq!(report.total_sold, 3);
        assert_eq!(report.total_income.cents(), 3000);
        assert_eq!(report.products.len(), 1);
        assert_eq!(report.products[0].sold, 3);
        assert_eq!(report.products[0].average_rating, 4.5);
        assert_eq!(report.products[0].stock, 12);
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let orders = vec![seller_order(
            "a",
            SellerPaymentStatus::Success,
            vec![
                seller_item("p2", ItemStatus::Finished, 1, 500),
                seller_item("p1", ItemStatus::Finished, 2, 1000),
            ],
        )];
        let store = StoreId::new("a");
        let facts = BTreeMap::new();
        let first = SalesTally::from_seller_orders(&store, &orders).into_report(
            store.clone(),
            UserId::new("s"),
            &facts,
        );
        let second = SalesTally::from_seller_orders(&store, &orders).into_report(
            store.clone(),
            UserId::new("s"),
            &facts,
        );
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.products[0].product_id, ProductId::new("p1"));
    }

    #[test]
    fn test_no_sales_yields_zero_report() {
        let store = StoreId::new("a");
        let report = SalesTally::from_seller_orders(&store, &[]).into_report(
            store.clone(),
            UserId::new("s"),
            &BTreeMap::new(),
        );
        assert_eq!(report, SalesReport::empty(store, UserId::new("s")));
    }
}
