//! Client-side name resolution agent.
//!
//! Resolves a service name to one healthy backend address for local
//! processes: relations come from an upstream registry, are cached with a
//! conditional refresh, picked with smooth weighted round robin, filtered
//! by active probing, and served over a small UDP protocol.

// Core subsystems
pub mod cache;
pub mod config;
pub mod discovery;
pub mod load_balancer;
pub mod protocol;
pub mod resolution;

// Traffic management
pub mod health;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::AgentConfig;
pub use lifecycle::{Agent, AgentHandle};
pub use protocol::NameClient;
pub use resolution::ResolutionService;
