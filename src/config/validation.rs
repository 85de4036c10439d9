//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that the registry bootstrap values are present
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AgentConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener port must not be 0")]
    ZeroPort,

    #[error("registry.address is required")]
    MissingRegistryAddress,

    #[error("registry.service_name is required")]
    MissingRegistryName,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.listener.bind_address.parse::<SocketAddr>() {
        Ok(addr) if addr.port() == 0 => errors.push(ValidationError::ZeroPort),
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        )),
    }

    if config.registry.address.trim().is_empty() {
        errors.push(ValidationError::MissingRegistryAddress);
    }
    if config.registry.service_name.trim().is_empty() {
        errors.push(ValidationError::MissingRegistryName);
    }

    let positive = [
        ("listener.recv_buffer_bytes", config.listener.recv_buffer_bytes as u64),
        ("registry.request_timeout_ms", config.registry.request_timeout_ms),
        ("cache.capacity", config.cache.capacity as u64),
        ("cache.relation_ttl_secs", config.cache.relation_ttl_secs),
        ("cache.health_ttl_secs", config.cache.health_ttl_secs),
        ("health_check.session_secs", config.health_check.session_secs),
        ("health_check.connect_timeout_ms", config.health_check.connect_timeout_ms),
        ("health_check.read_timeout_ms", config.health_check.read_timeout_ms),
        ("health_check.interval_ms", config.health_check.interval_ms),
        (
            "health_check.local_watch_interval_secs",
            config.health_check.local_watch_interval_secs,
        ),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(field));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
