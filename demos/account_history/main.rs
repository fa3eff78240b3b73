//! Prints the recent and the complete transfer history of an account.
//!
//! ```sh
//! RPC_URL=https://eth.llamarpc.com \
//! TOKEN=0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 \
//! ACCOUNT=0xd8dA6BF26964af9d7eed9e03e53415d37aa96045 \
//! DEPLOYMENT_BLOCK=6082465 TOKEN_DECIMALS=6 \
//! RUST_LOG=transfer_scanner=info cargo run --example account_history
//! ```

use std::{env, time::Duration};

use alloy::primitives::Address;
use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transfer_scanner::{
    BlockSpec, RpcLedger, RpcLedgerBuilder, ScanRequest, ScanResult, TransferScannerBuilder,
};

fn var<T>(name: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(name).with_context(|| format!("{name} is not set"))?;
    value.parse().with_context(|| format!("{name} is malformed: {value}"))
}

fn print(label: &str, result: &ScanResult) {
    println!("== {label}: {} transfers ==", result.records.len());
    for record in &result.records {
        println!(
            "{:>10} {} {:<8} {} -> {} {}",
            record.block_number,
            record.timestamp,
            record.direction,
            record.counterparty_from,
            record.counterparty_to,
            record.value_formatted,
        );
    }

    let diagnostics = &result.diagnostics;
    println!(
        "stopped at {:?} ({:?}), {} chunks in {} rounds",
        diagnostics.stopped_at,
        diagnostics.stop_reason,
        diagnostics.chunking.chunks_fetched,
        diagnostics.chunking.batches,
    );
    for failure in &diagnostics.failed_chunks {
        warn!(chunk = %failure.chunk, kind = ?failure.kind, "{}", failure.message);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let rpc_url: String = var("RPC_URL")?;
    let token: Address = var("TOKEN")?;
    let account: Address = var("ACCOUNT")?;
    let deployment_block: u64 = var("DEPLOYMENT_BLOCK").unwrap_or(0);
    let decimals: u8 = var("TOKEN_DECIMALS").unwrap_or(18);
    let exhaustive_from: BlockSpec = var("FROM_BLOCK").unwrap_or(BlockSpec::Earliest);

    let ledger: RpcLedger = RpcLedgerBuilder::new(rpc_url.as_str(), token)
        .call_timeout(Duration::from_secs(30))
        .max_retries(5)
        .min_delay(Duration::from_millis(500))
        .build()
        .await?;

    let scanner = TransferScannerBuilder::new()
        .first_existence_block(deployment_block)
        .token_decimals(decimals)
        .connect(ledger)?;

    info!(account = %account, "Scanning recent transfers");
    let recent = scanner.scan_bounded(&ScanRequest::new(account).limit(5)).await?;
    print("most recent", &recent);

    info!(account = %account, "Scanning complete history");
    let full = scanner.scan_exhaustive(account, exhaustive_from, BlockSpec::Latest).await?;
    print("complete history", &full);

    if !full.is_complete() {
        warn!(failed = full.diagnostics.failed_chunks.len(), "History has gaps, rerun to retry");
    }

    Ok(())
}
