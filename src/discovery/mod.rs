//! Upstream registry subsystem.
//!
//! # Data Flow
//! ```text
//! Resolver (name or local IP, last known set)
//!     → client.rs: GET /relation/getsFromName | getsFromIp  (cc, num)
//!         304 → previous set with carried rotation cursor
//!         200 → types.rs decodes {Rels, cc} into a fresh RelationSet
//!         else → DiscoveryError, caller keeps its stale set
//!
//! HealthMonitor (local origin verdict)
//!     → client.rs: GET /relation/reportOff (ipport, off)
//! ```

pub mod client;
pub mod types;

pub use client::DiscoveryClient;
pub use types::{DiscoveryError, DiscoveryResult};
