//! Collaborator contracts consumed by the orchestrator, with in-memory doubles.
//!
//! Every double can be switched into a failing mode so tests can exercise
//! the external-failure paths.

pub mod cart;
pub mod catalog;
pub mod gateway;
pub mod identity;
pub mod notification;
pub mod reviews;

pub use cart::{CartService, InMemoryCartService};
pub use catalog::{CatalogService, InMemoryCatalogService, Product};
pub use gateway::{
    FraudStatus, GatewayStatus, InMemoryPaymentGateway, PaymentGateway, TransactionStatus,
};
pub use identity::{IdentityService, InMemoryIdentityService, UserProfile};
pub use notification::{InMemoryNotificationSink, Notification, NotificationSink, Template};
pub use reviews::{InMemoryReviewService, ReviewService};
