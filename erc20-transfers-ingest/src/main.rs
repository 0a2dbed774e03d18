//! ERC-20 transfer ingestion CLI.
//!
//! Fetches the `Transfer` logs one token contract emitted in a single block,
//! stores each transfer exactly once, and prints every record stored so far.
//!
//! # Usage
//!
//! ```bash
//! # Latest block, USDC, SQLite file ./transfers.db
//! erc20-transfers-ingest
//!
//! # A specific block and token
//! erc20-transfers-ingest 19000000 --token dai
//!
//! # Store in Bigtable (token from BIGTABLE_ACCESS_TOKEN)
//! erc20-transfers-ingest 19000000 --store bigtable --project my-project --instance my-instance
//! ```
//!
//! A transfer that fails to save is logged and skipped; the run still
//! finishes, but the process exits with a non-zero status.

use std::path::PathBuf;
use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{Context, Result, bail};
use clap::Parser;
use erc20_transfers::{EventMapper, IngestionPipeline, RpcLogSource};
use erc20_transfers_ingest::backend;
use erc20_transfers_ingest::config::{Backend, Config, Overrides};
use erc20_transfers_ingest::tokens;

/// Timeout for the head-of-chain lookup.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// ERC-20 Transfer log ingester.
///
/// Stores every transfer of one block, then prints all stored transfers.
/// Exits with a non-zero status if any transfer failed to save; the others
/// are still stored and printed.
#[derive(Debug, Parser)]
#[command(name = "erc20-transfers-ingest", version, about)]
struct Cli {
    /// Block to ingest. Defaults to the latest block.
    block: Option<u64>,

    /// Configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Ethereum JSON-RPC endpoint.
    #[arg(long)]
    rpc: Option<String>,

    /// Token symbol (`usdc`, `dai`, ...) or contract address.
    #[arg(long)]
    token: Option<String>,

    /// Storage backend.
    #[arg(long = "store", value_enum)]
    backend: Option<Backend>,

    /// SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Bigtable project id.
    #[arg(long)]
    project: Option<String>,

    /// Bigtable instance id.
    #[arg(long)]
    instance: Option<String>,

    /// Bigtable table name.
    #[arg(long)]
    table: Option<String>,

    /// List the known token symbols and exit.
    #[arg(long)]
    list_tokens: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if cli.list_tokens {
        cmd_list_tokens();
        return Ok(());
    }

    let settings = Config::load(&cli.config)?.resolve(Overrides {
        rpc: cli.rpc,
        token: cli.token,
        backend: cli.backend,
        db_path: cli.db_path,
        project: cli.project,
        instance: cli.instance,
        table: cli.table,
    })?;

    tracing::info!(rpc = %settings.rpc, "connecting");
    let source = RpcLogSource::new(ProviderBuilder::new().connect_http(
        settings
            .rpc
            .parse()
            .with_context(|| format!("invalid RPC URL: {}", settings.rpc))?,
    ));

    let block = match cli.block {
        Some(block) => block,
        None => {
            let head = source.provider().get_block_number();
            let latest = tokio::time::timeout(REQUEST_TIMEOUT, head)
                .await
                .context("get_block_number timed out")?
                .context("get_block_number failed")?;
            tracing::info!(block = latest, "no block provided, using last block");
            latest
        }
    };

    let store = backend::open_store(&settings.store).await?;
    let pipeline = IngestionPipeline::new(EventMapper::new(source), store);

    let report = pipeline
        .ingest(settings.token, block)
        .await
        .with_context(|| format!("ingesting block {block}"))?;
    let records = pipeline.snapshot().await.context("reading stored transfers")?;
    print_records(&records);
    pipeline.close().await.context("closing store")?;

    if !report.failed.is_empty() {
        bail!("{} transfer(s) failed to save", report.failed.len());
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_records(records: &[erc20_transfers::Record]) {
    for record in records {
        println!("{record}");
    }
}

/// Execute `--list-tokens`.
#[allow(clippy::print_stdout)]
fn cmd_list_tokens() {
    println!("{:<8} {:<44} Decimals", "Symbol", "Address");
    println!("{}", "-".repeat(62));

    for token in tokens::ALL {
        println!("{:<8} {:<44} {}", token.symbol, token.address, token.decimals);
    }
}
