//! Cart lines as handed over by the cart collaborator.

use common::{ProductId, StoreId};
use serde::{Deserialize, Serialize};

use crate::Money;

/// A line in a buyer's cart.
///
/// `price` is the unit price snapshotted when the product was added to the
/// cart; checkout does not re-read it from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub product_image: Vec<String>,
    pub store_id: StoreId,
    pub quantity: u32,
    pub price: Money,
    pub selected: bool,
}

impl CartItem {
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}
