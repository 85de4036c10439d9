//! Shutdown coordination.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::resolution::ResolutionService;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe before spawning the task that listens.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A running agent.
///
/// Dropping the handle aborts its tasks; [`AgentHandle::stop`] lets them
/// exit cleanly. Probe sessions are not tracked and finish on their own.
pub struct AgentHandle {
    pub(crate) shutdown: Shutdown,
    pub(crate) tasks: JoinSet<()>,
    pub(crate) local_addr: SocketAddr,
    pub(crate) service: Arc<ResolutionService>,
}

impl AgentHandle {
    /// Address the lookup socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn service(&self) -> &Arc<ResolutionService> {
        &self.service
    }

    /// Signal every background task and wait for them to exit.
    pub async fn stop(mut self) {
        tracing::info!("Stopping agent");
        self.shutdown.trigger();
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Agent task terminated abnormally");
            }
        }
        tracing::info!("Agent stopped");
    }
}
