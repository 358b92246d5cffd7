//! Hardware type model and inventory counting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{policy::LendingPolicy, request::HardwareRequest};

/// A kind of lendable hardware with a fixed number of units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HardwareType {
    pub id: i32,
    /// Human readable name (unique)
    pub name: String,
    /// What is it used for, which items are in the package
    pub description: String,
    /// Image URL or storage reference
    pub image: Option<String>,
    /// Units owned by the lab
    pub total_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create hardware type request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateHardwareType {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 255))]
    pub image: Option<String>,
    #[validate(range(min = 0))]
    pub total_count: i32,
}

/// Update hardware type request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateHardwareType {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub image: Option<String>,
    #[validate(range(min = 0))]
    pub total_count: Option<i32>,
}

/// Request counts for one hardware type at a given instant.
///
/// `active_count` are units in a hacker's hands. `not_available_count` adds
/// the pending requests still inside their pickup window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryCounts {
    pub total_count: i64,
    pub active_count: i64,
    pub not_available_count: i64,
}

impl InventoryCounts {
    /// Count the requests of one type in memory.
    pub fn tally<'a, I>(
        total_count: i32,
        requests: I,
        policy: &LendingPolicy,
        now: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = &'a HardwareRequest>,
    {
        let mut counts = Self {
            total_count: total_count as i64,
            ..Self::default()
        };
        for request in requests {
            if request.is_active() {
                counts.active_count += 1;
                counts.not_available_count += 1;
            } else if request.is_pending(policy, now) {
                counts.not_available_count += 1;
            }
        }
        counts
    }

    /// Units not in anyone's possession (ignores pending reservations)
    pub fn remaining_count(&self) -> i64 {
        self.total_count - self.active_count
    }

    /// Units free to request right now
    pub fn available_count(&self) -> i64 {
        self.total_count - self.not_available_count
    }

    pub fn can_allocate(&self) -> bool {
        self.available_count() > 0
    }
}

/// Hardware type with its derived counts
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HardwareTypeSummary {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub total_count: i32,
    /// Units picked up and not returned
    pub active_count: i64,
    /// Units not picked up by anyone (total - active)
    pub remaining_count: i64,
    /// Units that can still be requested (total - active - pending)
    pub available_count: i64,
}

impl HardwareTypeSummary {
    pub fn new(hardware: HardwareType, counts: InventoryCounts) -> Self {
        Self {
            id: hardware.id,
            name: hardware.name,
            description: hardware.description,
            image: hardware.image,
            total_count: hardware.total_count,
            active_count: counts.active_count,
            remaining_count: counts.remaining_count(),
            available_count: counts.available_count(),
        }
    }
}

/// Entry of the public hardware feed consumed by dashboards
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicHardware {
    pub name: String,
    pub description: String,
    pub total: i32,
    pub url: Option<String>,
    pub available: i64,
}

/// Public hardware feed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicHardwareSnapshot {
    pub items: Vec<PublicHardware>,
    pub update_time: DateTime<Utc>,
}

impl PublicHardwareSnapshot {
    pub fn new(inventory: Vec<HardwareTypeSummary>, update_time: DateTime<Utc>) -> Self {
        let items = inventory
            .into_iter()
            .map(|hw| PublicHardware {
                name: hw.name,
                description: hw.description,
                total: hw.total_count,
                url: hw.image,
                available: hw.available_count,
            })
            .collect();
        Self { items, update_time }
    }
}
