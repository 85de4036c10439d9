//! Name agent daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   local process                          namesrv-agent
//!  ┌────────────┐  "<seq>,<name>"   ┌──────────────────────────────────────┐
//!  │ NameClient │ ────────────────▶ │ protocol::UdpServer (N workers)       │
//!  │            │ ◀──────────────── │   → resolution::ResolutionService     │
//!  └────────────┘  "<seq>,<addr>"   │       → cache (relation sets, flags)  │
//!                                   │       → load_balancer (smooth WRR)    │
//!                                   │       → discovery (registry HTTP) ────┼──▶ registry
//!                                   │       → health (TCP/UDP probes) ──────┼──▶ backends
//!                                   └──────────────────────────────────────┘
//! ```

use clap::{CommandFactory, Parser};
use std::net::SocketAddr;
use std::path::PathBuf;

use namesrv_agent::config::loader::read_config;
use namesrv_agent::config::validation::validate_config;
use namesrv_agent::config::AgentConfig;
use namesrv_agent::lifecycle::{wait_for_shutdown_signal, Agent};
use namesrv_agent::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "namesrv-agent", version, about = "Client-side name resolution agent")]
struct Cli {
    /// Listening port for lookups.
    #[arg(long)]
    port: Option<u16>,

    /// Static registry address (host:port).
    #[arg(long)]
    srv_addr: Option<String>,

    /// Service name the registry registers itself under.
    #[arg(long)]
    srv_name: Option<String>,

    /// Number of concurrent lookup workers (0 = CPUs).
    #[arg(long)]
    num_procs: Option<usize>,

    /// Optional TOML configuration file; flags take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut AgentConfig) {
        if let Some(port) = self.port {
            let mut bind = config
                .listener
                .bind_address
                .parse::<SocketAddr>()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], port)));
            bind.set_port(port);
            config.listener.bind_address = bind.to_string();
        }
        if let Some(addr) = &self.srv_addr {
            config.registry.address = addr.clone();
        }
        if let Some(name) = &self.srv_name {
            config.registry.service_name = name.clone();
        }
        if let Some(workers) = self.num_procs {
            config.listener.workers = workers;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging("namesrv_agent=info");

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => AgentConfig::default(),
    };
    cli.apply(&mut config);

    if let Err(errors) = validate_config(&config) {
        for err in &errors {
            eprintln!("error: {}", err);
        }
        eprintln!();
        let _ = Cli::command().print_help();
        std::process::exit(2);
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        workers = config.listener.effective_workers(),
        registry = %config.registry.address,
        registry_name = %config.registry.service_name,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let agent = Agent::start(config).await?;
    wait_for_shutdown_signal().await;
    agent.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
