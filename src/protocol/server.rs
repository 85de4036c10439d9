//! UDP lookup server.
//!
//! # Responsibilities
//! - Bind the shared lookup socket
//! - Run N reader tasks over it, each handling one datagram at a time
//! - Drop malformed datagrams without replying

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::config::ListenerConfig;
use crate::observability::metrics;
use crate::protocol::codec::{Request, Response};
use crate::resolution::ResolutionService;

/// Lookup server sharing one socket across its workers.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    service: Arc<ResolutionService>,
    workers: usize,
    buffer_size: usize,
}

impl UdpServer {
    /// Bind to the configured address.
    pub async fn bind(
        config: &ListenerConfig,
        service: Arc<ResolutionService>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(&config.bind_address).await?;
        tracing::info!(
            address = %socket.local_addr()?,
            workers = config.effective_workers(),
            "Lookup socket bound"
        );
        Ok(Self {
            socket: Arc::new(socket),
            service,
            workers: config.effective_workers(),
            buffer_size: config.recv_buffer_bytes.max(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(serve(
                id,
                Arc::clone(&self.socket),
                Arc::clone(&self.service),
                self.buffer_size,
                shutdown.resubscribe(),
            ));
        }
        drop(shutdown);

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Lookup worker terminated abnormally");
            }
        }
        tracing::info!("Lookup server stopped");
    }
}

async fn serve(
    id: usize,
    socket: Arc<UdpSocket>,
    service: Arc<ResolutionService>,
    buffer_size: usize,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut buf = vec![0u8; buffer_size];
    loop {
        let (len, peer) = tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    tracing::debug!(worker = id, error = %e, "recv_from failed");
                    continue;
                }
            },
            _ = shutdown.recv() => break,
        };
        if len == 0 {
            continue;
        }

        let request = match Request::decode(&buf[..len]) {
            Ok(request) => request,
            Err(e) => {
                metrics::record_dropped_datagram();
                tracing::debug!(worker = id, peer = %peer, error = %e, "Dropping malformed request");
                continue;
            }
        };

        let addr = service.resolve(request.name).await;
        tracing::trace!(worker = id, name = %request.name, addr = %addr, "Lookup answered");

        let response = Response {
            seq: request.seq,
            addr: &addr,
        }
        .encode();
        if let Err(e) = socket.send_to(&response, peer).await {
            tracing::debug!(worker = id, peer = %peer, error = %e, "send_to failed");
        }
    }
}
