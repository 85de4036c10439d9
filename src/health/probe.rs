//! Probe sessions.
//!
//! # Responsibilities
//! - Dial a backend repeatedly for a bounded wall-clock window
//! - Turn socket outcomes into Healthy/Unhealthy verdicts
//!
//! # State Machines
//! ```text
//! TCP:  dial ─timeout──────────────▶ (next iteration)
//!            ─error───────────────▶ Unhealthy, stop
//!            ─ok─▶ Healthy ─read─▶ EOF ─▶ re-dial ─refused─▶ Unhealthy
//!
//! UDP:  send empty datagram ─refused─▶ Unhealthy, stop
//!       read ─refused─▶ Unhealthy, stop
//!            ─timeout / data─▶ Healthy
//! ```
//!
//! # Design Decisions
//! - Iterations are spaced by `interval` so the probe never becomes load
//! - A silent UDP peer counts as alive: only an ICMP "port unreachable"
//!   (surfaced as connection refused) marks it down

use std::io;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::{sleep_until, timeout, Instant};

use crate::config::HealthCheckConfig;

/// Outcome of one probe iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

impl Verdict {
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Verdict::Unhealthy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Healthy => "healthy",
            Verdict::Unhealthy => "unhealthy",
        }
    }
}

/// Timing knobs shared by both probe kinds.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub session: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub interval: Duration,
}

impl From<&HealthCheckConfig> for ProbeSettings {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            session: config.session(),
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            interval: config.interval(),
        }
    }
}

fn is_refused(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ConnectionRefused
}

/// Run a TCP probing session against `addr`.
pub async fn probe_tcp<F>(addr: &str, settings: ProbeSettings, mut report: F)
where
    F: FnMut(Verdict),
{
    let started = Instant::now();
    while started.elapsed() < settings.session {
        let tick = Instant::now();

        match timeout(settings.connect_timeout, TcpStream::connect(addr)).await {
            Err(_) => {
                tracing::debug!(addr = %addr, "TCP probe dial timed out");
            }
            Ok(Err(e)) => {
                tracing::debug!(addr = %addr, error = %e, "TCP probe dial failed");
                report(Verdict::Unhealthy);
                return;
            }
            Ok(Ok(mut stream)) => {
                report(Verdict::Healthy);

                let mut buf = [0u8; 1];
                let read = timeout(settings.read_timeout, stream.read(&mut buf)).await;
                if let Ok(Ok(0)) = read {
                    // Peer closed on us: make sure the listener is still there.
                    drop(stream);
                    if let Ok(Err(e)) =
                        timeout(settings.connect_timeout, TcpStream::connect(addr)).await
                    {
                        if is_refused(&e) {
                            tracing::debug!(addr = %addr, "TCP probe re-dial refused");
                            report(Verdict::Unhealthy);
                        }
                    }
                }
            }
        }

        sleep_until(tick + settings.interval).await;
    }
}

/// Run a UDP probing session against `addr`.
pub async fn probe_udp<F>(addr: &str, settings: ProbeSettings, mut report: F)
where
    F: FnMut(Verdict),
{
    let local = if addr.starts_with('[') { "[::]:0" } else { "0.0.0.0:0" };
    let socket = match UdpSocket::bind(local).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!(addr = %addr, error = %e, "UDP probe could not bind a local socket");
            return;
        }
    };
    if let Err(e) = socket.connect(addr).await {
        tracing::debug!(addr = %addr, error = %e, "UDP probe connect failed");
        report(Verdict::Unhealthy);
        return;
    }

    let started = Instant::now();
    let mut buf = [0u8; 1];
    while started.elapsed() < settings.session {
        let tick = Instant::now();

        if let Err(e) = socket.send(&[]).await {
            if is_refused(&e) {
                report(Verdict::Unhealthy);
                return;
            }
            tracing::debug!(addr = %addr, error = %e, "UDP probe send failed");
        }

        match timeout(settings.read_timeout, socket.recv(&mut buf)).await {
            Ok(Err(e)) if is_refused(&e) => {
                report(Verdict::Unhealthy);
                return;
            }
            _ => report(Verdict::Healthy),
        }

        sleep_until(tick + settings.interval).await;
    }
}
