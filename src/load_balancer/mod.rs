//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Resolver holds Arc<RelationSet> for a service name
//!     → relation.rs (ordered ring + check code + cursor)
//!     → weighted.rs (smooth weighted round robin over the ring)
//!     → HealthView (skip addresses currently flagged unhealthy)
//!     → Return "host:port" or nothing
//! ```
//!
//! # Design Decisions
//! - The cursor lives in the set; the selector itself is stateless
//! - One lock per set serialises concurrent picks (gap-free rotation)
//! - Health is consulted through a trait so selection stays testable

pub mod relation;
pub mod weighted;

pub use relation::{Relation, RelationSet, Transport};
pub use weighted::Rotation;

/// Read-only view of address health used during selection.
pub trait HealthView {
    /// True if `addr` must not be handed out right now.
    fn is_unhealthy(&self, addr: &str) -> bool;
}
