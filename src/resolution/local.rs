//! Local-origin background tasks.
//!
//! # Responsibilities
//! - Periodically ask the registry which relations run on this host
//! - Forward probe verdicts for those relations to the registry

use std::io;
use std::net::{IpAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::health::OffReport;
use crate::load_balancer::RelationSet;
use crate::resolution::service::ResolutionService;

/// Address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick a
/// route and source address.
pub fn detect_local_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    let ip = socket.local_addr()?.ip();
    if ip.is_loopback() || ip.is_unspecified() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no routable local address (got {})", ip),
        ));
    }
    Ok(ip)
}

/// Refresh the local relation list every `period` until shutdown.
///
/// The last good set is kept across failed refreshes so the registry can
/// keep answering 304.
pub async fn watch_local(
    service: Arc<ResolutionService>,
    ip: String,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(ip = %ip, period_secs = period.as_secs(), "Local relation watch starting");

    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    let mut last: Option<RelationSet> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(set) = service.refresh_local(&ip, last.as_ref()).await {
                    last = Some(set);
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Local relation watch received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

/// Deliver local-origin verdicts to the current registry address.
pub async fn forward_reports(
    service: Arc<ResolutionService>,
    mut reports: mpsc::UnboundedReceiver<OffReport>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            Some(report) = reports.recv() => {
                let registry = service.registry_addr();
                if let Err(e) = service
                    .discovery()
                    .report_off(&registry, &report.addr, report.off)
                    .await
                {
                    tracing::warn!(
                        addr = %report.addr,
                        off = report.off,
                        registry = %registry,
                        error = %e,
                        "Failed to report local health"
                    );
                }
            }
            _ = shutdown.recv() => break,
            else => break,
        }
    }
}
