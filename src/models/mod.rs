//! Data models for the Hardware Lab

pub mod hardware_type;
pub mod policy;
pub mod request;
pub mod user;

// Re-export commonly used types
pub use hardware_type::{HardwareType, HardwareTypeSummary, InventoryCounts};
pub use policy::LendingPolicy;
pub use request::{HardwareRequest, RequestDetails, RequestFilter, RequestScope, RequestState};
pub use user::UserClaims;
