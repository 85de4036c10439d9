//! Short-lived health flags for remote addresses.

use std::time::Duration;

use crate::cache::{ExpiringCache, Lookup};
use crate::load_balancer::HealthView;

/// Address → "considered unreachable" store.
///
/// Flags expire after the configured TTL; an expired or missing flag
/// reads as healthy.
#[derive(Debug, Clone)]
pub struct HealthFlags {
    store: ExpiringCache<bool>,
    ttl: Duration,
}

impl HealthFlags {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            store: ExpiringCache::new(capacity),
            ttl,
        }
    }

    /// Record the latest verdict for `addr`.
    pub fn mark(&self, addr: &str, unhealthy: bool) {
        self.store.insert(addr, unhealthy, self.ttl);
    }

    pub fn is_unhealthy(&self, addr: &str) -> bool {
        matches!(self.store.get(addr), Lookup::Fresh(true))
    }
}

impl HealthView for HealthFlags {
    fn is_unhealthy(&self, addr: &str) -> bool {
        HealthFlags::is_unhealthy(self, addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_flag_expires_to_healthy() {
        let flags = HealthFlags::new(16, Duration::from_secs(5));
        assert!(!flags.is_unhealthy("10.0.0.1:9000"));

        flags.mark("10.0.0.1:9000", true);
        assert!(flags.is_unhealthy("10.0.0.1:9000"));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!flags.is_unhealthy("10.0.0.1:9000"));

        flags.mark("10.0.0.1:9000", true);
        flags.mark("10.0.0.1:9000", false);
        assert!(!flags.is_unhealthy("10.0.0.1:9000"));
    }
}
