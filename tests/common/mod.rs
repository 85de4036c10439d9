//! Shared utilities for integration testing.

#![allow(dead_code)]

use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use namesrv_agent::config::AgentConfig;

type Handler = dyn Fn(&str) -> (u16, String) + Send + Sync;

/// A registry stand-in speaking just enough HTTP/1.1.
///
/// The handler receives the request target (path and query) and returns a
/// status and a body. Every target is recorded in arrival order.
pub struct MockRegistry {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    accept: JoinHandle<()>,
}

impl MockRegistry {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let log = Arc::clone(&requests);
        let accept = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let handler = Arc::clone(&handler);
                        let log = Arc::clone(&log);
                        tokio::spawn(async move {
                            let _ = serve(socket, handler, log).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            addr,
            requests,
            accept,
        }
    }

    /// Stop accepting; the listening socket closes and new dials are refused.
    pub fn stop(&self) {
        self.accept.abort();
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// All request targets seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose target contains `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|target| target.contains(needle))
            .count()
    }

    /// Poll until at least `n` requests contain `needle`.
    pub async fn wait_for(&self, needle: &str, n: usize, within: Duration) -> bool {
        wait_until(within, || self.count(needle) >= n).await
    }
}

async fn serve(
    socket: TcpStream,
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(socket);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain headers; registry calls are bodiless GETs.
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    log.lock().unwrap().push(target.clone());

    let (status, body) = handler(&target);
    let status_text = match status {
        200 => "200 OK",
        304 => "304 Not Modified",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let response = if status == 304 {
        format!("HTTP/1.1 {}\r\nConnection: close\r\n\r\n", status_text)
    } else {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_text,
            body.len(),
            body
        )
    };

    let mut socket = reader.into_inner();
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}

/// A `getsFromName` / `getsFromIp` body. Each relation is
/// `(ip, port, udp, weight)`.
pub fn relations_body(check_code: &str, relations: &[(&str, u16, bool, u32)]) -> String {
    let rels: Vec<_> = relations
        .iter()
        .map(|(ip, port, udp, weight)| {
            json!({ "Name": "svc", "Ip": ip, "Port": port, "Udp": udp, "Weight": weight })
        })
        .collect();
    json!({ "Rels": rels, "cc": check_code }).to_string()
}

/// An empty relation list, used for the registry's own name.
pub fn empty_body() -> String {
    relations_body("empty", &[])
}

/// Agent configuration pointing at `registry` with probing off and an
/// ephemeral lookup port.
pub fn agent_config(registry: &str) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.listener.workers = 2;
    config.registry.address = registry.into();
    config.registry.service_name = "namesrv.ns".into();
    config.registry.request_timeout_ms = 1000;
    config.health_check.enabled = false;
    config.health_check.watch_local = false;
    config
}

/// A localhost port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Poll `condition` every 20ms until it holds or `within` elapses.
pub async fn wait_until<F: FnMut() -> bool>(within: Duration, mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
