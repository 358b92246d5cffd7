//! In-memory lending store
//!
//! Every operation runs under one mutex, which gives the same per-type
//! serialization the PostgreSQL store gets from row locks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::LendingStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        hardware_type::{CreateHardwareType, HardwareType, InventoryCounts, UpdateHardwareType},
        policy::LendingPolicy,
        request::{HardwareRequest, RequestFilter, Transition, TransitionOutcome},
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    types: BTreeMap<i32, HardwareType>,
    requests: BTreeMap<i32, HardwareRequest>,
    last_type_id: i32,
    last_request_id: i32,
}

impl MemoryState {
    fn hardware(&self, id: i32) -> AppResult<&HardwareType> {
        self.types
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Hardware type {} not found", id)))
    }

    fn counts(&self, hardware: &HardwareType, policy: &LendingPolicy, now: DateTime<Utc>) -> InventoryCounts {
        let requests = self.requests.values().filter(|r| r.type_id == hardware.id);
        InventoryCounts::tally(hardware.total_count, requests, policy, now)
    }

    fn ensure_unique_name(&self, name: &str, except: Option<i32>) -> AppResult<()> {
        let taken = self
            .types
            .values()
            .any(|t| t.name == name && Some(t.id) != except);
        if taken {
            return Err(AppError::Conflict(format!(
                "Hardware type '{}' already exists",
                name
            )));
        }
        Ok(())
    }
}

/// Lending store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryLendingStore {
    state: Mutex<MemoryState>,
}

impl MemoryLendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a request as-is, keeping its timestamps and skipping the
    /// availability check. Seeds unit test fixtures only.
    #[cfg(test)]
    pub(crate) async fn insert_request(&self, mut request: HardwareRequest) -> AppResult<HardwareRequest> {
        let mut state = self.state.lock().await;
        state.hardware(request.type_id)?;
        state.last_request_id += 1;
        request.id = state.last_request_id;
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }
}

#[async_trait]
impl LendingStore for MemoryLendingStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_types(&self) -> AppResult<Vec<HardwareType>> {
        let state = self.state.lock().await;
        let mut types: Vec<_> = state.types.values().cloned().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn get_type(&self, id: i32) -> AppResult<HardwareType> {
        let state = self.state.lock().await;
        state.hardware(id).cloned()
    }

    async fn get_types(&self, ids: &[i32]) -> AppResult<Vec<HardwareType>> {
        let state = self.state.lock().await;
        let mut types: Vec<_> = ids
            .iter()
            .filter_map(|id| state.types.get(id).cloned())
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types.dedup_by_key(|t| t.id);
        Ok(types)
    }

    async fn create_type(&self, data: &CreateHardwareType) -> AppResult<HardwareType> {
        let mut state = self.state.lock().await;
        state.ensure_unique_name(&data.name, None)?;

        let now = Utc::now();
        state.last_type_id += 1;
        let hardware = HardwareType {
            id: state.last_type_id,
            name: data.name.clone(),
            description: data.description.clone(),
            image: data.image.clone(),
            total_count: data.total_count,
            created_at: now,
            updated_at: now,
        };
        state.types.insert(hardware.id, hardware.clone());
        Ok(hardware)
    }

    async fn update_type(&self, id: i32, data: &UpdateHardwareType) -> AppResult<HardwareType> {
        let mut state = self.state.lock().await;
        state.hardware(id)?;
        if let Some(name) = &data.name {
            state.ensure_unique_name(name, Some(id))?;
        }

        let hardware = state
            .types
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Hardware type {} not found", id)))?;
        if let Some(name) = &data.name {
            hardware.name = name.clone();
        }
        if let Some(description) = &data.description {
            hardware.description = description.clone();
        }
        if let Some(image) = &data.image {
            hardware.image = Some(image.clone());
        }
        if let Some(total_count) = data.total_count {
            hardware.total_count = total_count;
        }
        hardware.updated_at = Utc::now();
        Ok(hardware.clone())
    }

    async fn delete_type(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.types.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Hardware type {} not found", id)));
        }
        state.requests.retain(|_, r| r.type_id != id);
        Ok(())
    }

    async fn inventory(
        &self,
        type_id: i32,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<InventoryCounts> {
        let state = self.state.lock().await;
        let hardware = state.hardware(type_id)?;
        Ok(state.counts(hardware, policy, now))
    }

    async fn inventories(
        &self,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<(HardwareType, InventoryCounts)>> {
        let state = self.state.lock().await;
        let mut rows: Vec<_> = state
            .types
            .values()
            .map(|hw| (hw.clone(), state.counts(hw, policy, now)))
            .collect();
        rows.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(rows)
    }

    async fn get_request(&self, id: i32) -> AppResult<HardwareRequest> {
        let state = self.state.lock().await;
        state
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    async fn get_requests(&self, ids: &[i32]) -> AppResult<Vec<HardwareRequest>> {
        let state = self.state.lock().await;
        let mut requests: Vec<_> = ids
            .iter()
            .filter_map(|id| state.requests.get(id).cloned())
            .collect();
        requests.sort_by_key(|r| r.id);
        requests.dedup_by_key(|r| r.id);
        Ok(requests)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<HardwareRequest>> {
        let state = self.state.lock().await;
        let mut requests: Vec<_> = state
            .requests
            .values()
            .filter(|r| filter.matches(r, policy, now))
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id));
        Ok(requests)
    }

    async fn count_requests(
        &self,
        filter: &RequestFilter,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .requests
            .values()
            .filter(|r| filter.matches(r, policy, now))
            .count();
        Ok(count as i64)
    }

    async fn create_request(
        &self,
        type_id: i32,
        requestor_id: i32,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Option<HardwareRequest>> {
        let mut state = self.state.lock().await;
        let hardware = state.hardware(type_id)?;
        if !state.counts(hardware, policy, now).can_allocate() {
            return Ok(None);
        }

        state.last_request_id += 1;
        let request = HardwareRequest {
            id: state.last_request_id,
            requestor_id,
            type_id,
            created_at: now,
            pickup_time: None,
            return_time: None,
            borrowed_by: None,
            returned_to: None,
        };
        state.requests.insert(request.id, request.clone());
        Ok(Some(request))
    }

    async fn apply_transition(
        &self,
        request_id: i32,
        transition: Transition,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let mut state = self.state.lock().await;
        let request = state
            .requests
            .get(&request_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;
        let counts = state.counts(state.hardware(request.type_id)?, policy, now);

        let outcome = transition.apply(request, &counts, policy, now)?;
        match &outcome {
            TransitionOutcome::Updated(request) => {
                state.requests.insert(request.id, request.clone());
            }
            TransitionOutcome::Cancelled(request) => {
                state.requests.remove(&request.id);
            }
        }
        Ok(outcome)
    }
}
