//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the name agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// UDP listener configuration.
    pub listener: ListenerConfig,

    /// Upstream registry settings.
    pub registry: RegistryConfig,

    /// Cache sizing and expiry.
    pub cache: CacheConfig,

    /// Active probing settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// UDP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8328").
    pub bind_address: String,

    /// Concurrent readers on the shared socket (0 = available CPUs).
    pub workers: usize,

    /// Size of each reader's datagram buffer.
    pub recv_buffer_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8328".to_string(),
            workers: 0,
            recv_buffer_bytes: 1024,
        }
    }
}

impl ListenerConfig {
    /// Number of reader tasks to spawn.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// Upstream registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Static registry address used until the registry's own relations are known.
    pub address: String,

    /// Service name under which the registry registers itself.
    pub service_name: String,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            service_name: String::new(),
            request_timeout_ms: 3000,
        }
    }
}

impl RegistryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries per store.
    pub capacity: usize,

    /// Freshness window of a resolved relation set, in seconds.
    pub relation_ttl_secs: u64,

    /// Lifetime of a health flag, in seconds.
    pub health_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            relation_ttl_secs: 5,
            health_ttl_secs: 5,
        }
    }
}

impl CacheConfig {
    pub fn relation_ttl(&self) -> Duration {
        Duration::from_secs(self.relation_ttl_secs)
    }

    pub fn health_ttl(&self) -> Duration {
        Duration::from_secs(self.health_ttl_secs)
    }
}

/// Active health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe every relation handed out by the resolver.
    pub enabled: bool,

    /// Watch the services the registry says are hosted on this machine.
    pub watch_local: bool,

    /// Override for the detected local IP.
    pub local_ip: Option<String>,

    /// How often the local relation list is refreshed, in seconds.
    pub local_watch_interval_secs: u64,

    /// Wall-clock length of one probing session, in seconds.
    pub session_secs: u64,

    /// TCP dial timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Read deadline used by both probe kinds, in milliseconds.
    pub read_timeout_ms: u64,

    /// Minimum spacing between probe iterations, in milliseconds.
    pub interval_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watch_local: true,
            local_ip: None,
            local_watch_interval_secs: 5,
            session_secs: 60,
            connect_timeout_ms: 10_000,
            read_timeout_ms: 1000,
            interval_ms: 1000,
        }
    }
}

impl HealthCheckConfig {
    pub fn local_watch_interval(&self) -> Duration {
        Duration::from_secs(self.local_watch_interval_secs)
    }

    pub fn session(&self) -> Duration {
        Duration::from_secs(self.session_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Address of the scrape endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9328".to_string(),
        }
    }
}
