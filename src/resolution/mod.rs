//! Resolution subsystem.
//!
//! # Data Flow
//! ```text
//! resolve(name)
//!     → relation cache
//!         Fresh   → pick → answer ("" if every relation is unhealthy), no network
//!         Stale   → pick → answer, single-flight background refresh
//!         Missing → synchronous refresh → pick → answer ("" if none)
//!     → refresh: registry_addr() → DiscoveryClient → cache → HealthMonitor(remote)
//!
//! watch_local (every few seconds)
//!     → DiscoveryClient by local IP → HealthMonitor(local)
//!     → OffReport channel → forward_reports → registry reportOff
//! ```
//!
//! # Design Decisions
//! - A failed refresh never evicts a working entry
//! - The registry address is itself resolved through the relation cache,
//!   with the configured address as the last resort

pub mod local;
pub mod service;

pub use local::{detect_local_ip, forward_reports, watch_local};
pub use service::ResolutionService;
