//! Identity collaborator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{StoreId, UserId};
use domain::ShippingAddress;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};

/// A buyer or seller profile with the address on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: UserId,
    pub name: String,
    pub address: Option<ShippingAddress>,
}

/// Buyer and seller lookups.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn find_buyer(&self, email: &UserId) -> Result<Option<UserProfile>>;

    async fn find_seller_by_email(&self, email: &UserId) -> Result<Option<UserProfile>>;

    /// Finds the seller that owns `store_id`.
    async fn find_seller_by_store(&self, store_id: &StoreId) -> Result<Option<UserProfile>>;
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    buyers: HashMap<UserId, UserProfile>,
    sellers: HashMap<UserId, UserProfile>,
    stores: HashMap<StoreId, UserId>,
}

/// In-memory identity service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityService {
    state: Arc<RwLock<InMemoryIdentityState>>,
    fail_store_lookup: Arc<AtomicBool>,
}

impl InMemoryIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_buyer(&self, profile: UserProfile) {
        self.state
            .write()
            .await
            .buyers
            .insert(profile.user.clone(), profile);
    }

    /// Registers a seller and the stores it owns.
    pub async fn add_seller(&self, profile: UserProfile, stores: &[StoreId]) {
        let mut state = self.state.write().await;
        for store_id in stores {
            state.stores.insert(store_id.clone(), profile.user.clone());
        }
        state.sellers.insert(profile.user.clone(), profile);
    }

    /// Configures store-to-seller lookups to fail.
    pub fn set_fail_store_lookup(&self, fail: bool) {
        self.fail_store_lookup.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn find_buyer(&self, email: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.state.read().await.buyers.get(email).cloned())
    }

    async fn find_seller_by_email(&self, email: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.state.read().await.sellers.get(email).cloned())
    }

    async fn find_seller_by_store(&self, store_id: &StoreId) -> Result<Option<UserProfile>> {
        if self.fail_store_lookup.load(Ordering::SeqCst) {
            return Err(FulfillmentError::external(
                "find_seller_by_store",
                "identity service unreachable",
            ));
        }
        let state = self.state.read().await;
        Ok(state
            .stores
            .get(store_id)
            .and_then(|seller| state.sellers.get(seller))
            .cloned())
    }
}
