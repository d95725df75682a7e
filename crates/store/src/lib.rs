//! Document stores for the fulfillment workflow.
//!
//! Orders, seller orders, payments and sales reports live in independent
//! stores with no cross-store transactions. Every status change goes through
//! a guarded write that reports a [`WriteOutcome`] instead of overwriting
//! blindly.

pub mod error;
mod guard;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{
    InMemoryOrderStore, InMemoryPaymentStore, InMemorySalesReportStore, InMemorySellerOrderStore,
};
pub use postgres::{
    PostgresOrderStore, PostgresPaymentStore, PostgresSalesReportStore, PostgresSellerOrderStore,
    run_migrations,
};
pub use store::{OrderStore, PaymentStore, SalesReportStore, SellerOrderStore, WriteOutcome};
