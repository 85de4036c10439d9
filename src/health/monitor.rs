//! Active health monitor.
//!
//! # Responsibilities
//! - Start one probing session per (address, origin) pair
//! - Route verdicts: remote → local health flags, local → registry report
//! - Release the dedup entry when a session ends

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::config::HealthCheckConfig;
use crate::health::flags::HealthFlags;
use crate::health::probe::{probe_tcp, probe_udp, ProbeSettings, Verdict};
use crate::load_balancer::{Relation, Transport};
use crate::observability::metrics;

/// Where a probed address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A service hosted on this machine; the registry owns its health.
    Local,
    /// A dependency resolved on behalf of local processes.
    Remote,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
        }
    }
}

/// A local-origin verdict waiting to be sent to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffReport {
    pub addr: String,
    pub off: bool,
}

/// Owns the pending-probe sets and spawns probing sessions.
#[derive(Debug)]
pub struct HealthMonitor {
    flags: HealthFlags,
    settings: ProbeSettings,
    enabled: bool,
    pending_local: Mutex<HashSet<String>>,
    pending_remote: Mutex<HashSet<String>>,
    reports: mpsc::UnboundedSender<OffReport>,
}

impl HealthMonitor {
    /// Create a monitor.
    ///
    /// Returns the monitor and a receiver for local-origin verdicts.
    pub fn new(
        flags: HealthFlags,
        config: &HealthCheckConfig,
    ) -> (Self, mpsc::UnboundedReceiver<OffReport>) {
        let (reports, report_rx) = mpsc::unbounded_channel();
        (
            Self {
                flags,
                settings: ProbeSettings::from(config),
                enabled: config.enabled,
                pending_local: Mutex::new(HashSet::new()),
                pending_remote: Mutex::new(HashSet::new()),
                reports,
            },
            report_rx,
        )
    }

    /// Start probing every relation not already under probe for `origin`.
    /// Returns the number of sessions started.
    pub fn arm(self: &Arc<Self>, relations: &[Relation], origin: Origin) -> usize {
        if !self.enabled {
            return 0;
        }

        let mut started = 0;
        let mut pending = self.pending(origin);
        for relation in relations {
            let addr = relation.addr();
            if !pending.insert(addr.clone()) {
                continue;
            }
            started += 1;

            let guard = PendingGuard {
                monitor: Arc::clone(self),
                addr: addr.clone(),
                origin,
            };
            let transport = relation.transport;
            let settings = self.settings;
            tokio::spawn(async move {
                tracing::debug!(addr = %addr, origin = origin.as_str(), transport = %transport, "Probe session starting");
                let monitor = Arc::clone(&guard.monitor);
                let report = |verdict: Verdict| monitor.record(&addr, transport, origin, verdict);
                match transport {
                    Transport::Tcp => probe_tcp(&addr, settings, report).await,
                    Transport::Udp => probe_udp(&addr, settings, report).await,
                }
                tracing::debug!(addr = %addr, origin = origin.as_str(), "Probe session finished");
                drop(guard);
            });
        }
        metrics::record_pending_probes(origin.as_str(), pending.len());
        started
    }

    pub fn is_pending(&self, addr: &str, origin: Origin) -> bool {
        self.pending(origin).contains(addr)
    }

    pub fn pending_count(&self, origin: Origin) -> usize {
        self.pending(origin).len()
    }

    pub fn flags(&self) -> &HealthFlags {
        &self.flags
    }

    fn record(&self, addr: &str, transport: Transport, origin: Origin, verdict: Verdict) {
        metrics::record_probe_verdict(transport.as_str(), origin.as_str(), verdict.as_str());
        if verdict.is_unhealthy() {
            tracing::info!(addr = %addr, origin = origin.as_str(), "Backend unreachable");
        }

        match origin {
            Origin::Remote => self.flags.mark(addr, verdict.is_unhealthy()),
            Origin::Local => {
                let report = OffReport {
                    addr: addr.to_string(),
                    off: verdict.is_unhealthy(),
                };
                if self.reports.send(report).is_err() {
                    tracing::debug!(addr = %addr, "Report channel closed, dropping local verdict");
                }
            }
        }
    }

    fn pending(&self, origin: Origin) -> MutexGuard<'_, HashSet<String>> {
        let set = match origin {
            Origin::Local => &self.pending_local,
            Origin::Remote => &self.pending_remote,
        };
        set.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the dedup entry when the probing task ends, panics included.
struct PendingGuard {
    monitor: Arc<HealthMonitor>,
    addr: String,
    origin: Origin,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = self.monitor.pending(self.origin);
        pending.remove(&self.addr);
        metrics::record_pending_probes(self.origin.as_str(), pending.len());
    }
}
