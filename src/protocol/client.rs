//! UDP lookup client.
//!
//! Each attempt uses a fresh socket and a new sequence number; the agent's
//! reply must echo that number. A mismatched sequence or an empty address
//! is retried exactly once before the error is surfaced.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::protocol::codec::{ProtocolError, Request, Response};

pub const DEFAULT_AGENT_ADDR: &str = "127.0.0.1:8328";

/// Errors surfaced by [`NameClient::resolve`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("agent address '{0}' did not resolve")]
    AgentAddress(String),

    #[error("no reply from agent within {0:?}")]
    Timeout(Duration),

    #[error("malformed reply: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("sequence mismatch: sent {sent}, received {received}")]
    SequenceMismatch { sent: u64, received: u64 },

    #[error("no address found for '{0}'")]
    NoAddress(String),
}

enum Attempt {
    Address(String),
    Retry(ClientError),
}

/// Client for a running agent.
#[derive(Debug)]
pub struct NameClient {
    agent: String,
    timeout: Duration,
    seq: AtomicU32,
}

impl NameClient {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            timeout: Duration::from_secs(3),
            seq: AtomicU32::new(rand::random()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve `name` to `host:port` through the agent.
    pub async fn resolve(&self, name: &str) -> Result<String, ClientError> {
        let agent = self.agent_addr().await?;
        let mut last = ClientError::NoAddress(name.to_string());

        for attempt in 0..=1 {
            match self.exchange(agent, name).await? {
                Attempt::Address(addr) => return Ok(addr),
                Attempt::Retry(err) => {
                    tracing::debug!(name = %name, attempt, error = %err, "Lookup attempt rejected");
                    last = err;
                }
            }
        }
        Err(last)
    }

    fn next_seq(&self) -> u64 {
        u64::from(self.seq.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }

    async fn agent_addr(&self) -> Result<SocketAddr, ClientError> {
        lookup_host(&self.agent)
            .await?
            .next()
            .ok_or_else(|| ClientError::AgentAddress(self.agent.clone()))
    }

    async fn exchange(&self, agent: SocketAddr, name: &str) -> Result<Attempt, ClientError> {
        let local = if agent.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(agent).await?;

        let seq = self.next_seq();
        let request = Request { seq, name }.encode();
        timeout(self.timeout, socket.send(&request))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;

        let mut buf = [0u8; 1024];
        let len = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;

        let response = Response::decode(&buf[..len])?;
        if response.seq != seq {
            return Ok(Attempt::Retry(ClientError::SequenceMismatch {
                sent: seq,
                received: response.seq,
            }));
        }
        if response.addr.is_empty() {
            return Ok(Attempt::Retry(ClientError::NoAddress(name.to_string())));
        }
        Ok(Attempt::Address(response.addr.to_string()))
    }
}

impl Default for NameClient {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_ADDR)
    }
}
