//! Domain types and DTOs
//!
//! Entities owned by the tender aggregate plus the request/response
//! payloads the validation layer hands to the core.

pub mod award;
pub mod bid;
pub mod cancellation;
pub mod contract;
pub mod lot;
pub mod qualification;
pub mod tender;
pub mod value;

// Re-export commonly used types
pub use award::*;
pub use bid::*;
pub use cancellation::*;
pub use contract::*;
pub use lot::*;
pub use qualification::*;
pub use tender::*;
pub use value::*;

/// New opaque identifier in the 32-hex form used across the aggregate.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
