//! Promptforge - prompt-optimization engine entry point
//!
//! Two modes: `serve` runs the HTTP API for the dashboard, `optimize` runs a
//! single optimization and prints the record as JSON.

use clap::{Parser, Subcommand};
use promptforge_core::{
    api::{ApiServer, ApiServerConfig, EngineHandle},
    EngineConfig, OptimizationProcessor, TaskType,
};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "promptforge", version, about = "Prompt-optimization scoring and aggregation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Run a single optimization and print the record as JSON
    Optimize {
        /// The prompt to optimize
        prompt: String,
        /// Task type: coding, creative, analysis or qa
        #[arg(long, default_value = "qa")]
        task_type: String,
        /// Fixed RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("promptforge=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::load()?;

    match cli.command {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.api_addr = addr;
            }
            let api_config = ApiServerConfig {
                addr: config.api_addr,
            };
            let engine = EngineHandle::new(config);
            ApiServer::new(api_config, engine).serve().await
        }
        Command::Optimize {
            prompt,
            task_type,
            seed,
        } => {
            if seed.is_some() {
                config.rng_seed = seed;
            }
            let task_type: TaskType = task_type.parse()?;
            let processor = OptimizationProcessor::new(config);

            let record = processor.optimize(&prompt, task_type).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);

            Ok(())
        }
    }
}
