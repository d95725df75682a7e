//! Buyer order document, item state machine, and checkout.

mod aggregate;
mod checkout;
mod state;
mod value_objects;

pub use aggregate::{Order, PaymentMirror};
pub use checkout::{checkout, fan_out};
pub use state::{ItemAction, ItemStatus};
pub use value_objects::{Money, OrderItem, ShippingAddress};
