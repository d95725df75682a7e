//! Identifiers shared by every layer of the fulfillment workspace.

mod types;

pub use types::{OrderId, ProductId, StoreId, UserId};
