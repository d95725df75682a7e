//! Typed cache keys.

use common::{OrderId, StoreId, UserId};

/// What a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePurpose {
    /// One buyer order.
    BuyerOrder,
    /// All orders of one buyer.
    BuyerOrders,
    /// One seller order.
    SellerOrder,
    /// All seller orders of one seller.
    SellerOrders,
    /// The sales report of one store.
    SalesReport,
}

impl CachePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePurpose::BuyerOrder => "buyer-order",
            CachePurpose::BuyerOrders => "buyer-orders",
            CachePurpose::SellerOrder => "seller-order",
            CachePurpose::SellerOrders => "seller-orders",
            CachePurpose::SalesReport => "sales-report",
        }
    }
}

impl std::fmt::Display for CachePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cache key built from a purpose and an identity.
///
/// Rendered as `"{purpose}:{identity}"`. Detail keys use the composite
/// identity `{user}/{order_id}` so that two orders of one user never share
/// a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    purpose: CachePurpose,
    identity: String,
}

impl CacheKey {
    pub fn new(purpose: CachePurpose, identity: impl Into<String>) -> Self {
        Self {
            purpose,
            identity: identity.into(),
        }
    }

    pub fn buyer_order(buyer: &UserId, order_id: OrderId) -> Self {
        Self::new(CachePurpose::BuyerOrder, format!("{buyer}/{order_id}"))
    }

    pub fn buyer_orders(buyer: &UserId) -> Self {
        Self::new(CachePurpose::BuyerOrders, buyer.as_str())
    }

    pub fn seller_order(seller: &UserId, order_id: OrderId) -> Self {
        Self::new(CachePurpose::SellerOrder, format!("{seller}/{order_id}"))
    }

    pub fn seller_orders(seller: &UserId) -> Self {
        Self::new(CachePurpose::SellerOrders, seller.as_str())
    }

    pub fn sales_report(store_id: &StoreId) -> Self {
        Self::new(CachePurpose::SalesReport, store_id.as_str())
    }

    pub fn purpose(&self) -> CachePurpose {
        self.purpose
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.purpose, self.identity)
    }
}
