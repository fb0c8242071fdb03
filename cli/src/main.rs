//! chainwatch CLI — run a contract event watcher from a TOML config.
//!
//! # Commands
//! ```
//! chainwatch run   --config chainwatch.toml
//! chainwatch plan  --from 0 --to 250 --chunk-size 100
//! chainwatch topic "Transfer(address indexed from, address indexed to, uint256 value)"
//! chainwatch info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chainwatch_core::{range, EventHandler, HandlerRegistry, Watcher, WatcherConfig};
use chainwatch_evm::{AbiLogDecoder, HttpChainClient, HttpClientConfig};

mod config;
mod handlers;
mod logging;

use config::FileConfig;

#[derive(Parser)]
#[command(
    name = "chainwatch",
    about = "Contract event watcher — poll, decode and dispatch EVM logs",
    long_about = "
chainwatch: poll an EVM node for contract logs, decode them against their ABI
and dispatch them in order to handlers.

ENVIRONMENT VARIABLES:
  CHAINWATCH_RPC_URL   overrides rpc_url from the config file
  RUST_LOG             overrides the [log] section
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the configured contracts until interrupted (Ctrl-C)
    Run {
        /// Path to the TOML config file
        #[arg(short, long, default_value = "chainwatch.toml")]
        config: PathBuf,
    },

    /// Print the getLogs chunks planned for a block range
    Plan {
        #[arg(long)]
        from: u64,
        #[arg(long)]
        to: u64,
        /// Maximum chunk width (0 = one query)
        #[arg(long, default_value_t = 0)]
        chunk_size: u64,
    },

    /// Print the topic0 hash of an event signature
    Topic {
        /// e.g. "Transfer(address,address,uint256)"
        signature: String,
    },

    /// Show chainwatch build and default configuration info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => cmd_run(config).await,
        Commands::Plan { from, to, chunk_size } => {
            cmd_plan(from, to, chunk_size);
            Ok(())
        }
        Commands::Topic { signature } => cmd_topic(&signature),
        Commands::Info => {
            cmd_info();
            Ok(())
        }
    }
}

async fn cmd_run(path: PathBuf) -> Result<()> {
    let cfg = FileConfig::load(&path)?;
    logging::init_tracing(&cfg.log);

    let client = HttpChainClient::new(
        cfg.rpc_url.clone(),
        HttpClientConfig {
            request_timeout: Duration::from_millis(cfg.request_timeout_ms),
        },
    )?;

    let logger: Arc<dyn EventHandler> = Arc::new(handlers::LoggingHandler);
    let mut handler_registry = HandlerRegistry::new();
    let mut registrations = Vec::with_capacity(cfg.contracts.len());
    for contract in &cfg.contracts {
        let abi = contract.load_abi()?;
        let bound = handlers::bind_abi_events(
            &mut handler_registry,
            &contract.contract_type,
            &abi,
            &logger,
        );
        tracing::debug!(contract_type = %contract.contract_type, events = bound, "handlers bound");
        registrations.push(contract.registration(abi));
    }

    let watcher = Arc::new(
        Watcher::new(cfg.watcher.clone(), client, AbiLogDecoder, handler_registry)
            .context("failed to create watcher")?,
    );
    for registration in registrations {
        watcher.update_registry(registration);
    }

    tracing::info!(
        rpc = %cfg.rpc_url,
        instance = %watcher.instance_id(),
        contracts = cfg.contracts.len(),
        "chainwatch starting"
    );
    watcher.init();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    tracing::info!(
        last_processed_block = watcher.last_processed_block(),
        dispatched = watcher.dispatch_stats().dispatched(),
        handler_failures = watcher.dispatch_stats().handler_failures(),
        "shutting down"
    );
    watcher.destroy();
    Ok(())
}

fn cmd_plan(from: u64, to: u64, chunk_size: u64) {
    let chunks = range::plan(from, to, chunk_size);
    if chunks.is_empty() {
        println!("(empty range)");
        return;
    }
    for (i, chunk) in chunks.iter().enumerate() {
        println!("{i:>4}  {chunk}");
    }
}

fn cmd_topic(signature: &str) -> Result<()> {
    let event = chainwatch_evm::parse_event(signature)?;
    println!("{}", event.signature());
    println!("{:#x}", event.selector());
    Ok(())
}

fn cmd_info() {
    let defaults = WatcherConfig::default();
    println!("chainwatch v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default from block:           {}", defaults.from_block);
    println!("  Default confirmation latency: {} blocks", defaults.confirmation_latency);
    println!("  Default chunk size:           unbounded");
    println!("  Default poll interval:        {} ms", defaults.poll_interval_ms);
    println!("  Cursor on fetch failure:      advance (set advance_on_fetch_failure = false to hold)");
    println!("  Chains: EVM (Ethereum, Arbitrum, Base, Polygon, Optimism, ...)");
}
