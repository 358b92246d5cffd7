//! Repository layer for hardware types and requests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        hardware_type::{CreateHardwareType, HardwareType, InventoryCounts, UpdateHardwareType},
        policy::LendingPolicy,
        request::{HardwareRequest, RequestFilter, Transition, TransitionOutcome},
    },
};

pub use memory::MemoryLendingStore;
pub use postgres::PgLendingStore;

/// Storage for hardware types and requests.
///
/// `create_request` and `apply_transition` are atomic: implementations
/// serialize them per hardware type so that the counts a decision is based on
/// cannot change before the decision is persisted. Every count is taken at
/// the `now` handed in by the caller.
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// Check the backing store is reachable
    async fn ping(&self) -> AppResult<()>;

    /// List hardware types ordered by name
    async fn list_types(&self) -> AppResult<Vec<HardwareType>>;

    async fn get_type(&self, id: i32) -> AppResult<HardwareType>;

    /// Fetch the given types, silently skipping unknown ids
    async fn get_types(&self, ids: &[i32]) -> AppResult<Vec<HardwareType>>;

    async fn create_type(&self, data: &CreateHardwareType) -> AppResult<HardwareType>;

    async fn update_type(&self, id: i32, data: &UpdateHardwareType) -> AppResult<HardwareType>;

    /// Delete a type together with its requests
    async fn delete_type(&self, id: i32) -> AppResult<()>;

    /// Counts for one type
    async fn inventory(
        &self,
        type_id: i32,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<InventoryCounts>;

    /// Every type with its counts, ordered by name
    async fn inventories(
        &self,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<(HardwareType, InventoryCounts)>>;

    async fn get_request(&self, id: i32) -> AppResult<HardwareRequest>;

    /// Fetch the given requests, silently skipping unknown ids
    async fn get_requests(&self, ids: &[i32]) -> AppResult<Vec<HardwareRequest>>;

    /// Requests matching `filter`, oldest first
    async fn list_requests(
        &self,
        filter: &RequestFilter,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<HardwareRequest>>;

    async fn count_requests(
        &self,
        filter: &RequestFilter,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<i64>;

    /// Create a pending request if a unit is available, `None` otherwise
    async fn create_request(
        &self,
        type_id: i32,
        requestor_id: i32,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<Option<HardwareRequest>>;

    /// Validate and persist a transition on an existing request
    async fn apply_transition(
        &self,
        request_id: i32,
        transition: Transition,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome>;
}
