//! Hardware request model and lifecycle rules
//!
//! A request moves through these states, all derived from its timestamps:
//!
//! ```text
//! Pending ──(window elapses)──> Expired
//!    │ ──pick_up──> Active ──give_back──> Returned
//!    └──cancel──> (row deleted)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{
    hardware_type::{HardwareType, InventoryCounts},
    policy::LendingPolicy,
};
use crate::error::LendingError;

/// One unit reserved by a hacker against a hardware type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HardwareRequest {
    pub id: i32,
    pub requestor_id: i32,
    pub type_id: i32,
    pub created_at: DateTime<Utc>,
    /// Unset until an organizer hands out the item
    pub pickup_time: Option<DateTime<Utc>>,
    /// Unset until the item comes back
    pub return_time: Option<DateTime<Utc>>,
    /// Organizer who gave out the item
    pub borrowed_by: Option<i32>,
    /// Organizer who received the item back
    pub returned_to: Option<i32>,
}

/// Derived request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Pending,
    Expired,
    Active,
    Returned,
}

impl HardwareRequest {
    pub fn is_picked_up(&self) -> bool {
        self.pickup_time.is_some()
    }

    /// Picked up and not returned
    pub fn is_active(&self) -> bool {
        self.pickup_time.is_some() && self.return_time.is_none()
    }

    /// Not picked up and still inside its pickup window
    pub fn is_pending(&self, policy: &LendingPolicy, now: DateTime<Utc>) -> bool {
        self.pickup_time.is_none() && self.created_at >= policy.expiry_cutoff(now)
    }

    pub fn is_expired(&self, policy: &LendingPolicy, now: DateTime<Utc>) -> bool {
        self.pickup_time.is_none() && !self.is_pending(policy, now)
    }

    /// Time left to pick the item up. Zero once picked up, negative once expired.
    pub fn remaining_time(&self, policy: &LendingPolicy, now: DateTime<Utc>) -> Duration {
        if self.is_picked_up() {
            return Duration::zero();
        }
        self.created_at + policy.expiry_window() - now
    }

    pub fn state(&self, policy: &LendingPolicy, now: DateTime<Utc>) -> RequestState {
        match (self.pickup_time, self.return_time) {
            (Some(_), Some(_)) => RequestState::Returned,
            (Some(_), None) => RequestState::Active,
            (None, _) if self.is_pending(policy, now) => RequestState::Pending,
            (None, _) => RequestState::Expired,
        }
    }

    /// Hand the item out. `inventory` must be counted while the type is locked.
    pub fn pick_up(
        &mut self,
        organizer_id: i32,
        inventory: &InventoryCounts,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), LendingError> {
        if self.is_picked_up() {
            return Err(LendingError::AlreadyPickedUp);
        }
        if self.remaining_time(policy, now) < Duration::zero() {
            return Err(LendingError::Expired);
        }
        if inventory.remaining_count() <= 0 {
            return Err(LendingError::NoItemsAvailable);
        }

        self.borrowed_by = Some(organizer_id);
        self.pickup_time = Some(now);
        Ok(())
    }

    /// Take the item back. Only an active request can be returned.
    pub fn give_back(&mut self, organizer_id: i32, now: DateTime<Utc>) -> Result<(), LendingError> {
        let Some(pickup_time) = self.pickup_time else {
            return Err(LendingError::NotPickedUp);
        };
        if self.return_time.is_some() {
            return Err(LendingError::AlreadyReturned);
        }

        self.returned_to = Some(organizer_id);
        self.return_time = Some(now.max(pickup_time));
        Ok(())
    }

    /// Check the request may be withdrawn by its requestor
    pub fn ensure_cancellable(
        &self,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), LendingError> {
        if self.remaining_time(policy, now) < Duration::zero() {
            return Err(LendingError::Expired);
        }
        if self.is_picked_up() {
            return Err(LendingError::AlreadyPickedUp);
        }
        Ok(())
    }
}

/// Staff or requestor initiated state change on an existing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    PickUp { organizer_id: i32 },
    Return { organizer_id: i32 },
    Cancel,
}

/// What the store has to persist after a transition was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Updated(HardwareRequest),
    /// The request row must be deleted
    Cancelled(HardwareRequest),
}

impl TransitionOutcome {
    pub fn into_request(self) -> HardwareRequest {
        match self {
            TransitionOutcome::Updated(request) | TransitionOutcome::Cancelled(request) => request,
        }
    }
}

impl Transition {
    /// Whether the hardware type row must be locked before counting
    pub fn reserves_inventory(&self) -> bool {
        matches!(self, Transition::PickUp { .. })
    }

    pub fn apply(
        self,
        mut request: HardwareRequest,
        inventory: &InventoryCounts,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, LendingError> {
        match self {
            Transition::PickUp { organizer_id } => {
                request.pick_up(organizer_id, inventory, policy, now)?;
                Ok(TransitionOutcome::Updated(request))
            }
            Transition::Return { organizer_id } => {
                request.give_back(organizer_id, now)?;
                Ok(TransitionOutcome::Updated(request))
            }
            Transition::Cancel => {
                request.ensure_cancellable(policy, now)?;
                Ok(TransitionOutcome::Cancelled(request))
            }
        }
    }
}

/// Projection of requests used by the listing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestScope {
    /// Not picked up, inside the pickup window
    Pending,
    /// Pending plus everything ever picked up
    Historic,
    /// Picked up, not returned
    Active,
}

impl RequestScope {
    pub fn matches(&self, request: &HardwareRequest, policy: &LendingPolicy, now: DateTime<Utc>) -> bool {
        match self {
            RequestScope::Pending => request.is_pending(policy, now),
            RequestScope::Historic => request.is_pending(policy, now) || request.is_picked_up(),
            RequestScope::Active => request.is_active(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFilter {
    /// All requestors when unset
    pub requestor_id: Option<i32>,
    pub scope: RequestScope,
}

impl RequestFilter {
    pub fn for_user(requestor_id: i32, scope: RequestScope) -> Self {
        Self {
            requestor_id: Some(requestor_id),
            scope,
        }
    }

    pub fn overall(scope: RequestScope) -> Self {
        Self {
            requestor_id: None,
            scope,
        }
    }

    pub fn matches(&self, request: &HardwareRequest, policy: &LendingPolicy, now: DateTime<Utc>) -> bool {
        self.requestor_id.map_or(true, |id| request.requestor_id == id)
            && self.scope.matches(request, policy, now)
    }
}

/// Request with its hardware type and derived state, for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestDetails {
    pub id: i32,
    pub requestor_id: i32,
    pub type_id: i32,
    pub type_name: String,
    pub type_description: String,
    pub created_at: DateTime<Utc>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub return_time: Option<DateTime<Utc>>,
    pub borrowed_by: Option<i32>,
    pub returned_to: Option<i32>,
    pub state: RequestState,
    /// Seconds left to pick the item up (0 once picked up, negative once expired)
    pub remaining_seconds: i64,
}

impl RequestDetails {
    pub fn new(
        request: HardwareRequest,
        hardware: &HardwareType,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let state = request.state(policy, now);
        let remaining_seconds = request.remaining_time(policy, now).num_seconds();
        Self {
            id: request.id,
            requestor_id: request.requestor_id,
            type_id: request.type_id,
            type_name: hardware.name.clone(),
            type_description: hardware.description.clone(),
            created_at: request.created_at,
            pickup_time: request.pickup_time,
            return_time: request.return_time,
            borrowed_by: request.borrowed_by,
            returned_to: request.returned_to,
            state,
            remaining_seconds,
        }
    }
}

/// Result of a bulk pickup or return
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchOutcome {
    /// Requests that were updated
    pub processed: Vec<HardwareRequest>,
    /// Failure message keyed by hardware type name
    pub failures: BTreeMap<String, String>,
}

/// Result of requesting several units of several types
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RequestAmountsOutcome {
    pub created: Vec<HardwareRequest>,
    /// Number of units that could not be allocated, keyed by hardware type name
    pub failures: BTreeMap<String, u32>,
}

/// Pending and active counts for one hacker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub pending: i64,
    pub active: i64,
}
