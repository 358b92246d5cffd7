//! Hardware inventory service: types, availability and new requests

use std::{collections::BTreeMap, sync::Arc};

use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult, LendingError},
    models::{
        hardware_type::{
            CreateHardwareType, HardwareType, HardwareTypeSummary, PublicHardwareSnapshot,
            UpdateHardwareType,
        },
        policy::LendingPolicy,
        request::{HardwareRequest, RequestAmountsOutcome},
    },
    repository::LendingStore,
    services::redis::RedisService,
};

const SNAPSHOT_KEY: &str = "hardware:snapshot";

/// Redis cache for the public feed
#[derive(Clone)]
pub struct SnapshotCache {
    pub redis: RedisService,
    pub ttl_seconds: u64,
}

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn LendingStore>,
    clock: Arc<dyn Clock>,
    policy: LendingPolicy,
    cache: Option<SnapshotCache>,
}

impl InventoryService {
    pub fn new(
        store: Arc<dyn LendingStore>,
        clock: Arc<dyn Clock>,
        policy: LendingPolicy,
        cache: Option<SnapshotCache>,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            cache,
        }
    }

    /// All hardware types with their counts
    pub async fn list_inventory(&self) -> AppResult<Vec<HardwareTypeSummary>> {
        let rows = self.store.inventories(&self.policy, self.clock.now()).await?;
        Ok(rows
            .into_iter()
            .map(|(hardware, counts)| HardwareTypeSummary::new(hardware, counts))
            .collect())
    }

    /// Hardware types that still have a unit to request
    pub async fn list_available(&self) -> AppResult<Vec<HardwareTypeSummary>> {
        let mut inventory = self.list_inventory().await?;
        inventory.retain(|hw| hw.available_count > 0);
        Ok(inventory)
    }

    pub async fn get(&self, id: i32) -> AppResult<HardwareTypeSummary> {
        let hardware = self.store.get_type(id).await?;
        let counts = self.store.inventory(id, &self.policy, self.clock.now()).await?;
        Ok(HardwareTypeSummary::new(hardware, counts))
    }

    pub async fn create(&self, data: &CreateHardwareType) -> AppResult<HardwareType> {
        data.validate()?;
        let hardware = self.store.create_type(data).await?;
        tracing::info!("Created hardware type {} ({} units)", hardware.name, hardware.total_count);
        Ok(hardware)
    }

    pub async fn update(&self, id: i32, data: &UpdateHardwareType) -> AppResult<HardwareType> {
        data.validate()?;
        let hardware = self.store.update_type(id, data).await?;
        tracing::info!("Updated hardware type {}", hardware.name);
        Ok(hardware)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.store.delete_type(id).await?;
        tracing::info!("Deleted hardware type {}", id);
        Ok(())
    }

    fn ensure_requests_open(&self) -> AppResult<()> {
        if self.policy.hackers_can_request() {
            Ok(())
        } else {
            Err(LendingError::RequestsClosed.into())
        }
    }

    /// Reserve one unit for `requestor_id`. `None` when nothing is available.
    pub async fn request(
        &self,
        type_id: i32,
        requestor_id: i32,
    ) -> AppResult<Option<HardwareRequest>> {
        self.ensure_requests_open()?;

        let request = self
            .store
            .create_request(type_id, requestor_id, &self.policy, self.clock.now())
            .await?;
        match &request {
            Some(r) => tracing::info!(
                "User {} requested hardware type {} (request {})",
                requestor_id,
                type_id,
                r.id
            ),
            None => tracing::info!(
                "No unit of hardware type {} available for user {}",
                type_id,
                requestor_id
            ),
        }
        Ok(request)
    }

    /// Reserve several units of several types. Units that cannot be allocated
    /// are counted per type name; the others stay reserved.
    pub async fn request_amounts(
        &self,
        requestor_id: i32,
        amounts: &BTreeMap<i32, u32>,
    ) -> AppResult<RequestAmountsOutcome> {
        self.ensure_requests_open()?;

        let ids: Vec<i32> = amounts.keys().copied().collect();
        let types = self.store.get_types(&ids).await?;
        let mut outcome = RequestAmountsOutcome::default();

        for hardware in types {
            let amount = amounts.get(&hardware.id).copied().unwrap_or(0);
            for done in 0..amount {
                let created = match self.request(hardware.id, requestor_id).await {
                    Ok(created) => created,
                    // type deleted meanwhile
                    Err(AppError::NotFound(_)) => None,
                    Err(e) => return Err(e),
                };
                match created {
                    Some(request) => outcome.created.push(request),
                    None => {
                        // nothing frees up while we loop
                        outcome.failures.insert(hardware.name.clone(), amount - done);
                        break;
                    }
                }
            }
        }

        if !outcome.failures.is_empty() {
            tracing::warn!(
                "User {} could not request: {:?}",
                requestor_id,
                outcome.failures
            );
        }
        Ok(outcome)
    }

    /// Name, description, total and available count of every type, for dashboards
    pub async fn public_snapshot(&self) -> AppResult<PublicHardwareSnapshot> {
        if let Some(cache) = &self.cache {
            match cache.redis.get_json::<PublicHardwareSnapshot>(SNAPSHOT_KEY).await {
                Ok(Some(snapshot)) => return Ok(snapshot),
                Ok(None) => {}
                Err(e) => tracing::warn!("Hardware snapshot cache unavailable: {}", e),
            }
        }

        let snapshot = PublicHardwareSnapshot::new(self.list_inventory().await?, self.clock.now());

        if let Some(cache) = &self.cache {
            if let Err(e) = cache
                .redis
                .set_json_ex(SNAPSHOT_KEY, &snapshot, cache.ttl_seconds)
                .await
            {
                tracing::warn!("Failed to cache hardware snapshot: {}", e);
            }
        }
        Ok(snapshot)
    }
}
