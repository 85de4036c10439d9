//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the resolver and its collaborators from configuration
//! - Bind the lookup socket
//! - Start background tasks (workers, local watch, report forwarding)
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned before a task is spawned
//! - Every task subscribes to shutdown before it is spawned

use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::AgentConfig;
use crate::discovery::DiscoveryError;
use crate::lifecycle::shutdown::{AgentHandle, Shutdown};
use crate::protocol::UdpServer;
use crate::resolution::{detect_local_ip, forward_reports, watch_local, ResolutionService};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to bind lookup socket: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Could not determine local IP: {0}")]
    LocalIp(#[source] std::io::Error),

    #[error("Failed to build registry client: {0}")]
    Discovery(#[from] DiscoveryError),
}

/// Entry point for running the agent.
pub struct Agent;

impl Agent {
    /// Start every subsystem. The configuration is assumed validated.
    pub async fn start(config: AgentConfig) -> Result<AgentHandle, StartupError> {
        let local_ip = if config.health_check.enabled && config.health_check.watch_local {
            let ip = match &config.health_check.local_ip {
                Some(ip) => ip.clone(),
                None => detect_local_ip().map_err(StartupError::LocalIp)?.to_string(),
            };
            tracing::info!(local_ip = %ip, "Local relation watch enabled");
            Some(ip)
        } else {
            None
        };

        let (service, reports) = ResolutionService::from_config(&config)?;
        let server = UdpServer::bind(&config.listener, Arc::clone(&service))
            .await
            .map_err(StartupError::Bind)?;
        let local_addr = server.local_addr().map_err(StartupError::Bind)?;

        let shutdown = Shutdown::new();
        let mut tasks = JoinSet::new();

        tasks.spawn(server.run(shutdown.subscribe()));
        tasks.spawn(forward_reports(
            Arc::clone(&service),
            reports,
            shutdown.subscribe(),
        ));
        if let Some(ip) = local_ip {
            tasks.spawn(watch_local(
                Arc::clone(&service),
                ip,
                config.health_check.local_watch_interval(),
                shutdown.subscribe(),
            ));
        }

        tracing::info!(
            address = %local_addr,
            registry = %config.registry.address,
            registry_name = %config.registry.service_name,
            "Agent started"
        );

        Ok(AgentHandle {
            shutdown,
            tasks,
            local_addr,
            service,
        })
    }
}
