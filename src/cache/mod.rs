//! Local caching subsystem.
//!
//! # Data Flow
//! ```text
//! registry refresh ──▶ relation store   (name → Arc<RelationSet>)
//! probe verdict    ──▶ health store     (addr → unhealthy flag)
//!
//! resolver lookup:
//!     Fresh  → answer from cache, no network
//!     Stale  → answer from cache, revalidate in background
//!     Missing→ refresh synchronously
//! ```
//!
//! # Design Decisions
//! - One generic store per value type instead of a type-erased map
//! - Expired values stay readable until evicted (stale-while-revalidate)
//! - Replacing a value is atomic per key; values are never mutated in place

pub mod expiring;

pub use expiring::{ExpiringCache, Lookup};
