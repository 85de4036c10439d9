//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → ResolutionService + HealthMonitor → bind socket → spawn tasks
//!
//! Shutdown (shutdown.rs):
//!     AgentHandle::stop → broadcast → workers / watch / forwarder exit → join
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → main calls AgentHandle::stop
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{AgentHandle, Shutdown};
pub use signals::wait_for_shutdown_signal;
pub use startup::{Agent, StartupError};
