use clap::{Parser, Subcommand};
use std::time::Duration;

use namesrv_agent::protocol::{NameClient, DEFAULT_AGENT_ADDR};

#[derive(Parser)]
#[command(name = "namesrv-cli")]
#[command(about = "Lookup CLI for the name resolution agent", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_AGENT_ADDR)]
    agent: String,

    #[arg(short, long, default_value_t = 3000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a service name to a backend address
    Resolve {
        name: String,

        /// Repeat the lookup to watch the rotation
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = NameClient::new(cli.agent).with_timeout(Duration::from_millis(cli.timeout_ms));

    match cli.command {
        Commands::Resolve { name, count } => {
            let mut failed = false;
            for _ in 0..count.max(1) {
                match client.resolve(&name).await {
                    Ok(addr) => println!("{}", addr),
                    Err(e) => {
                        eprintln!("error: {}", e);
                        failed = true;
                    }
                }
            }
            if failed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
