//! Business logic services

pub mod inventory;
pub mod redis;
pub mod requests;

use std::sync::Arc;

use crate::{clock::Clock, models::policy::LendingPolicy, repository::LendingStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn LendingStore>,
    pub inventory: inventory::InventoryService,
    pub requests: requests::RequestService,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(
        store: Arc<dyn LendingStore>,
        clock: Arc<dyn Clock>,
        policy: LendingPolicy,
        cache: Option<inventory::SnapshotCache>,
    ) -> Self {
        Self {
            inventory: inventory::InventoryService::new(store.clone(), clock.clone(), policy, cache),
            requests: requests::RequestService::new(store.clone(), clock, policy),
            store,
        }
    }
}
