//! Order fulfillment and payment reconciliation.
//!
//! [`OrderOrchestrator`] is the only component with business rules. It
//! drives the document stores, the cache and the external collaborators:
//!
//! ```text
//! cart + catalog ──► create_order ──► order + seller orders ──► cache invalidate ──► outbox
//! gateway webhook ──► reconcile_payment ──► payment ► order ► seller orders ──► outbox
//! finish_order_item ──► order ► seller order ──► sales report recompute
//! ```
//!
//! Multi-document writes are not transactional. Creation compensates on
//! failure; mirrored status writes retry once and leave the rest to
//! [`OrderOrchestrator::repair_order`].

mod compensation;
pub mod config;
pub mod error;
pub mod hub;
pub mod orchestrator;
pub mod outbox;
pub mod services;

pub use config::OrchestratorConfig;
pub use error::{ErrorKind, FulfillmentError, Result};
pub use hub::{DeliveryOutcome, NotificationHub};
pub use orchestrator::{
    Actor, Collaborators, OrderOrchestrator, RepairAction, RepairKind, RepairReport,
    RepairSummary, Stores,
};
pub use outbox::{Outbox, OutboxStats, OutboxWorker};
