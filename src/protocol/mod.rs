//! UDP lookup protocol.
//!
//! # Data Flow
//! ```text
//! client.rs ── "<seq>,<name>" ──▶ server.rs worker
//!                                   → ResolutionService::resolve(name)
//! client.rs ◀── "<seq>,<addr>" ── server.rs worker
//! ```
//!
//! # Design Decisions
//! - Stateless per datagram; correctness rests on the echoed sequence
//! - An empty address is the only failure signal to clients
//! - Malformed requests get no reply

pub mod client;
pub mod codec;
pub mod server;

pub use client::{ClientError, NameClient, DEFAULT_AGENT_ADDR};
pub use codec::{ProtocolError, Request, Response};
pub use server::UdpServer;
