#![allow(dead_code)]

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use transfer_scanner::{
    TransferScanner, TransferScannerBuilder,
    test_utils::{ACCOUNT, MockLedger, OTHER},
};

pub const DEPLOYMENT_BLOCK: u64 = 50;
pub const TIP: u64 = 250;

/// One token with 18 decimals.
pub const ONE_TOKEN: u64 = 1_000_000_000_000_000_000;

/// `RUST_LOG=transfer_scanner=debug cargo test` shows the scanner's logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Tip 250, deployment block 50. `ACCOUNT` sent at 100, 150, 200 and received at 120, 180.
pub fn fixture_ledger() -> MockLedger {
    MockLedger::new(TIP)
        .with_transfer(100, ACCOUNT, OTHER, ONE_TOKEN)
        .with_transfer(120, OTHER, ACCOUNT, 2 * ONE_TOKEN)
        .with_transfer(150, ACCOUNT, OTHER, ONE_TOKEN / 2)
        .with_transfer(180, OTHER, ACCOUNT, 3 * ONE_TOKEN)
        .with_transfer(200, ACCOUNT, OTHER, 1)
}

/// Small chunks so the 200-block fixture spans several rounds.
pub fn scanner_builder() -> TransferScannerBuilder {
    TransferScannerBuilder::new()
        .first_existence_block(DEPLOYMENT_BLOCK)
        .bounded_block_range(25)
        .bounded_concurrency(2)
        .exhaustive_block_range(40)
        .exhaustive_pacing(Duration::ZERO)
        .max_shrink_steps(2)
}

pub fn setup_scanner(ledger: MockLedger) -> anyhow::Result<TransferScanner<MockLedger>> {
    init_tracing();
    Ok(scanner_builder().connect(ledger)?)
}
