//! Domain layer for order fulfillment.
//!
//! This crate holds the data model and the pure rules over it:
//! - Buyer `Order` and seller-scoped `SellerOrder` documents
//! - The per-item status state machine (`ItemStatus`, `ItemAction`)
//! - Payment record and payment status mirrors
//! - Checkout fan-out and sales aggregation
//!
//! Nothing here performs I/O.

pub mod cart;
pub mod error;
pub mod order;
pub mod payment;
pub mod review;
pub mod sales_report;
pub mod seller_order;

pub use cart::CartItem;
pub use error::DomainError;
pub use order::{
    ItemAction, ItemStatus, Money, Order, OrderItem, PaymentMirror, ShippingAddress, checkout,
    fan_out,
};
pub use payment::{Payment, PaymentConfirmation, PaymentStatus, SellerPaymentStatus};
pub use review::{Review, average_rating};
pub use sales_report::{ProductFacts, ProductSales, SalesReport, SalesTally};
pub use seller_order::{SellerOrder, SellerOrderItem};
