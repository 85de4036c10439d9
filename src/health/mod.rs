//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Resolver refresh / local watch
//!     → monitor.rs arm(relations, origin)
//!         dedup per (addr, origin), one task per new address
//!     → probe.rs TCP or UDP session (bounded window, ~1s spacing)
//!     → verdict
//!         remote origin → flags.rs (short-TTL unhealthy flag)
//!         local origin  → OffReport channel → registry reportOff
//! ```
//!
//! # Design Decisions
//! - Probe errors never leave the probing task; verdicts are the only output
//! - Flags expire on their own so a stale judgement cannot outlive probing
//! - A finished session frees its slot; the next resolution re-arms it

pub mod flags;
pub mod monitor;
pub mod probe;

pub use flags::HealthFlags;
pub use monitor::{HealthMonitor, OffReport, Origin};
pub use probe::{ProbeSettings, Verdict};
