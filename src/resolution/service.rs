//! Name resolution.
//!
//! # Responsibilities
//! - Answer a lookup from the cached relation set whenever one exists
//! - Refresh synchronously on a cold miss, in the background when stale
//! - Resolve the registry's own address through the same cache
//! - Arm health probing for every relation the registry returns

use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::{ExpiringCache, Lookup};
use crate::config::{AgentConfig, RegistryConfig};
use crate::discovery::{DiscoveryClient, DiscoveryResult};
use crate::health::{HealthFlags, HealthMonitor, OffReport, Origin};
use crate::load_balancer::{Relation, RelationSet};
use crate::observability::metrics;

/// Resolves service names to one healthy backend address.
#[derive(Debug)]
pub struct ResolutionService {
    discovery: DiscoveryClient,
    relations: ExpiringCache<Arc<RelationSet>>,
    flags: HealthFlags,
    monitor: Arc<HealthMonitor>,
    registry: RegistryConfig,
    relation_ttl: Duration,
    refreshing: Mutex<HashSet<String>>,
}

impl ResolutionService {
    pub fn new(
        config: &AgentConfig,
        discovery: DiscoveryClient,
        flags: HealthFlags,
        monitor: Arc<HealthMonitor>,
    ) -> Self {
        Self {
            discovery,
            relations: ExpiringCache::new(config.cache.capacity),
            flags,
            monitor,
            registry: config.registry.clone(),
            relation_ttl: config.cache.relation_ttl(),
            refreshing: Mutex::new(HashSet::new()),
        }
    }

    /// Build the service and its collaborators from configuration.
    ///
    /// Returns the service and the receiver of local-origin verdicts, which
    /// the caller is expected to drain with [`forward_reports`].
    ///
    /// [`forward_reports`]: crate::resolution::local::forward_reports
    pub fn from_config(
        config: &AgentConfig,
    ) -> DiscoveryResult<(Arc<Self>, mpsc::UnboundedReceiver<OffReport>)> {
        let discovery = DiscoveryClient::new(config.registry.request_timeout())?;
        let flags = HealthFlags::new(config.cache.capacity, config.cache.health_ttl());
        let (monitor, reports) = HealthMonitor::new(flags.clone(), &config.health_check);
        let service = Self::new(config, discovery, flags, Arc::new(monitor));
        Ok((Arc::new(service), reports))
    }

    /// Resolve `name` to `host:port`, or an empty string if nothing is
    /// available.
    pub async fn resolve(self: &Arc<Self>, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        if name == self.registry.service_name {
            return self.registry_addr();
        }

        let addr = match self.relations.get(name) {
            Lookup::Fresh(set) => {
                metrics::record_resolution("fresh");
                self.pick(&set)
            }
            Lookup::Stale(set) => {
                // Answer from the old set, revalidate behind the caller.
                metrics::record_resolution("stale");
                let addr = self.pick(&set);
                self.spawn_refresh(name, Some(set));
                addr
            }
            Lookup::Missing => {
                let addr = self.refresh(name, None).await.and_then(|set| self.pick(&set));
                if addr.is_some() {
                    metrics::record_resolution("refreshed");
                }
                addr
            }
        };

        if addr.is_none() {
            metrics::record_resolution("empty");
        }
        addr.unwrap_or_default()
    }

    /// Current registry address: a healthy registry relation if known,
    /// the static address otherwise. Revalidates in the background when
    /// the registry's own entry is missing or stale.
    pub fn registry_addr(self: &Arc<Self>) -> String {
        let name = self.registry.service_name.as_str();
        let lookup = self.relations.get(name);
        let fresh = lookup.is_fresh();
        let cached = lookup.into_value();
        let addr = cached
            .as_deref()
            .and_then(|set| self.pick(set))
            .unwrap_or_else(|| self.registry.address.clone());

        if !fresh {
            self.spawn_registry_refresh(cached);
        }
        addr
    }

    /// Conditionally refresh the relations hosted on `ip` and arm local
    /// probing for them. `None` on failure.
    pub async fn refresh_local(
        self: &Arc<Self>,
        ip: &str,
        previous: Option<&RelationSet>,
    ) -> Option<RelationSet> {
        let registry = self.registry_addr();
        match self.discovery.relations_by_ip(&registry, ip, previous).await {
            Ok(set) => {
                metrics::record_refresh("local", "ok");
                self.monitor.arm(set.relations(), Origin::Local);
                Some(set)
            }
            Err(e) => {
                metrics::record_refresh("local", "error");
                tracing::warn!(ip = %ip, registry = %registry, error = %e, "Local relation refresh failed");
                None
            }
        }
    }

    /// Cached relation set for `name`, fresh or stale.
    pub fn cached(&self, name: &str) -> Option<Arc<RelationSet>> {
        self.relations.get(name).into_value()
    }

    pub fn discovery(&self) -> &DiscoveryClient {
        &self.discovery
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn flags(&self) -> &HealthFlags {
        &self.flags
    }

    fn pick(&self, set: &RelationSet) -> Option<String> {
        set.record_request();
        set.pick_addr(&self.flags)
    }

    async fn refresh(
        self: &Arc<Self>,
        name: &str,
        previous: Option<Arc<RelationSet>>,
    ) -> Option<Arc<RelationSet>> {
        let registry = self.registry_addr();
        match self
            .discovery
            .relations_by_name(&registry, name, previous.as_deref())
            .await
        {
            Ok(set) => {
                metrics::record_refresh("name", "ok");
                Some(self.store(name, set))
            }
            Err(e) => {
                metrics::record_refresh("name", "error");
                tracing::warn!(
                    name = %name,
                    registry = %registry,
                    error = %e,
                    "Registry refresh failed, keeping last known relations"
                );
                None
            }
        }
    }

    fn store(&self, name: &str, set: RelationSet) -> Arc<RelationSet> {
        let set = Arc::new(set);
        self.relations
            .insert(name, Arc::clone(&set), self.relation_ttl);
        self.monitor.arm(set.relations(), Origin::Remote);
        tracing::debug!(name = %name, relations = set.relations().len(), check_code = %set.check_code(), "Relations cached");
        set
    }

    fn spawn_refresh(self: &Arc<Self>, name: &str, previous: Option<Arc<RelationSet>>) {
        let Some(guard) = InFlight::begin(self, name) else {
            return;
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.refresh(&guard.name, previous).await;
            drop(guard);
        });
    }

    fn spawn_registry_refresh(self: &Arc<Self>, previous: Option<Arc<RelationSet>>) {
        let Some(guard) = InFlight::begin(self, &self.registry.service_name) else {
            return;
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut candidates: Vec<String> = previous
                .as_deref()
                .map(|set| set.relations().iter().map(Relation::addr).collect())
                .unwrap_or_default();
            candidates.shuffle(&mut rand::thread_rng());
            candidates.push(this.registry.address.clone());

            for candidate in candidates {
                match this
                    .discovery
                    .relations_by_name(&candidate, &guard.name, previous.as_deref())
                    .await
                {
                    Ok(set) => {
                        metrics::record_refresh("registry", "ok");
                        this.store(&guard.name, set);
                        return;
                    }
                    Err(e) => {
                        tracing::debug!(registry = %candidate, error = %e, "Registry candidate failed");
                    }
                }
            }
            metrics::record_refresh("registry", "error");
            tracing::warn!(name = %guard.name, "No registry candidate answered, using last known registry relations");
        });
    }

    fn lock_refreshing(&self) -> MutexGuard<'_, HashSet<String>> {
        self.refreshing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a background refresh of one name as in flight.
struct InFlight {
    service: Arc<ResolutionService>,
    name: String,
}

impl InFlight {
    fn begin(service: &Arc<ResolutionService>, name: &str) -> Option<Self> {
        if !service.lock_refreshing().insert(name.to_string()) {
            return None;
        }
        Some(Self {
            service: Arc::clone(service),
            name: name.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.service.lock_refreshing().remove(&self.name);
    }
}
